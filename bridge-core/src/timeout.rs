//! Timeout wrappers for async read/write operations using compio's timer.

use compio::buf::{IoBuf, IoBufMut};
use compio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use compio::time::timeout;
use std::io;
use std::time::Duration;

/// Read into `buf`, failing with `ErrorKind::TimedOut` if nothing completes
/// within `duration`.
///
/// On timeout the buffer is lost along with the in-flight read; callers
/// that need the buffer back for reuse should treat a timeout as fatal to
/// the connection, not retry in place.
pub async fn read_with_timeout<S, B>(
    stream: &mut S,
    buf: B,
    duration: Duration,
) -> io::Result<compio::buf::BufResult<usize, B>>
where
    S: AsyncRead + Unpin,
    B: IoBufMut,
{
    timeout(duration, stream.read(buf))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "read timed out"))
}

/// Write all of `buf`, failing with `ErrorKind::TimedOut` if the write does
/// not complete within `duration`.
pub async fn write_all_with_timeout<S, B>(
    stream: &mut S,
    buf: B,
    duration: Duration,
) -> io::Result<compio::buf::BufResult<(), B>>
where
    S: AsyncWrite + Unpin,
    B: IoBuf,
{
    timeout(duration, stream.write_all(buf))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timed out"))
}
