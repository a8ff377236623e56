//! TCP utilities for high-performance networking.
//!
//! This module provides generic TCP optimizations that are protocol-agnostic.
//!
//! # Safety
//!
//! This module uses unsafe code to access raw file descriptors/sockets for
//! TCP socket configuration. The unsafe operations are encapsulated and safe
//! to use from the public API.

#![allow(unsafe_code)]

use std::io;

/// Enable TCP_NODELAY on a compio TcpStream for minimal latency.
///
/// This disables Nagle's algorithm, trading bandwidth efficiency for lower latency.
/// Essential for request-reply patterns and real-time messaging.
///
/// # Platform Support
///
/// Supported on Unix (Linux, macOS) and Windows platforms.
///
/// # Errors
///
/// Returns an error if the socket option cannot be set.
#[inline]
pub fn enable_tcp_nodelay(stream: &compio::net::TcpStream) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::{AsRawFd, FromRawFd};
        let fd = stream.as_raw_fd();
        let sock = unsafe { socket2::Socket::from_raw_fd(fd) };
        sock.set_nodelay(true)?;
        std::mem::forget(sock); // Don't close the fd
        Ok(())
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::{AsRawSocket, FromRawSocket};
        let raw = stream.as_raw_socket();
        let sock = unsafe { socket2::Socket::from_raw_socket(raw) };
        sock.set_nodelay(true)?;
        std::mem::forget(sock); // Don't close the socket
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    {
        // Unsupported platform - just continue without TCP_NODELAY
        Ok(())
    }
}

/// Apply `SO_SNDBUF`/`SO_RCVBUF` to a freshly accepted stream.
///
/// Either bound may be `None`, in which case the OS default for that
/// direction is left untouched.
///
/// # Errors
///
/// Returns an error if either socket option cannot be set.
#[inline]
pub fn configure_socket_buffers(
    stream: &compio::net::TcpStream,
    send_buffer_bytes: Option<usize>,
    recv_buffer_bytes: Option<usize>,
) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::{AsRawFd, FromRawFd};
        let fd = stream.as_raw_fd();
        let sock = unsafe { socket2::Socket::from_raw_fd(fd) };
        let result = (|| {
            if let Some(bytes) = send_buffer_bytes {
                sock.set_send_buffer_size(bytes)?;
            }
            if let Some(bytes) = recv_buffer_bytes {
                sock.set_recv_buffer_size(bytes)?;
            }
            Ok(())
        })();
        std::mem::forget(sock);
        result
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::{AsRawSocket, FromRawSocket};
        let raw = stream.as_raw_socket();
        let sock = unsafe { socket2::Socket::from_raw_socket(raw) };
        let result = (|| {
            if let Some(bytes) = send_buffer_bytes {
                sock.set_send_buffer_size(bytes)?;
            }
            if let Some(bytes) = recv_buffer_bytes {
                sock.set_recv_buffer_size(bytes)?;
            }
            Ok(())
        })();
        std::mem::forget(sock);
        result
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = (send_buffer_bytes, recv_buffer_bytes);
        Ok(())
    }
}
