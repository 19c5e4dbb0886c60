//! Non-blocking keyboard polling.

use std::io;

use tracing::{debug, trace};

/// Bytes requested from stdin per poll.
pub const INPUT_BUFFER_SIZE: usize = 16;

/// A byte stream that may report `WouldBlock` when it has nothing to give.
pub trait InputSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Reads straight from file descriptor 0, bypassing std's buffered `Stdin`
/// so a non-blocking descriptor surfaces `WouldBlock` on every empty poll.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawStdin;

impl InputSource for RawStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        nix::unistd::read(libc::STDIN_FILENO, buf).map_err(io::Error::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `q` or `Q` was pressed.
    Quit,
    /// Stdin reached end of stream.
    EndOfInput,
    /// A termination signal was delivered.
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    Continue,
    Stop(StopReason),
}

/// Make one read attempt and decide whether the animation should stop.
///
/// An empty, would-block read is the normal outcome. Only the first byte of
/// a read is inspected. Every other error, `EINTR` included, is returned to
/// the caller as fatal. A non-blocking read never sleeps, so it is not
/// interrupted by signals in practice.
pub fn poll_input<I: InputSource + ?Sized>(source: &mut I) -> io::Result<Poll> {
    let mut buf = [0u8; INPUT_BUFFER_SIZE];
    match source.read(&mut buf) {
        Ok(0) => {
            debug!("input:eof");
            Ok(Poll::Stop(StopReason::EndOfInput))
        }
        Ok(n) => match buf[0] {
            b'q' | b'Q' => {
                debug!(bytes = n, "input:quit");
                Ok(Poll::Stop(StopReason::Quit))
            }
            other => {
                trace!(bytes = n, first = other, "input:ignored");
                Ok(Poll::Continue)
            }
        },
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Poll::Continue),
        Err(e) => Err(e),
    }
}
