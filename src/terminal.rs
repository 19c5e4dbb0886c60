//! Terminal session lifecycle.
//!
//! [`TerminalSession::prepare`] puts the terminal into animation mode and
//! [`TerminalSession::teardown`] undoes every step in reverse. Teardown runs at
//! most once per session: calling it again is a no-op, and dropping a session
//! that was never torn down restores the terminal on the way out (error
//! returns and panics included).
//!
//! On a tty, stdin and stdout share one open file description, so putting
//! stdin into non-blocking mode makes stdout non-blocking too. Writes can
//! then fail with `WouldBlock` whenever output is paused (Ctrl-S) or the
//! terminal is slow to drain. Frames that cannot start are dropped; setup,
//! teardown and the rest of a partly written frame wait for the terminal.

use std::io::{self, Stdout, Write};
use std::os::fd::{AsFd, RawFd};

use crossterm::style::Print;
use crossterm::{cursor, queue, terminal};
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::ansi::{CursorHome, PopScreen, PushScreen, RestoreCursor, SaveCursor};
use crate::frames::Frame;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Expected a tty at STDOUT (fd={})", libc::STDOUT_FILENO)]
    NotATty,

    #[error("failed to write to the terminal: {0}")]
    Io(#[from] io::Error),

    #[error("failed to change stdin mode: {0}")]
    Stdin(#[from] nix::Error),
}

/// Switches the blocking mode of standard input.
pub trait StdinMode {
    fn set_nonblocking(&mut self, enabled: bool) -> nix::Result<()>;
}

/// [`StdinMode`] that edits the `O_NONBLOCK` file status flag of a descriptor.
#[derive(Debug, Clone, Copy)]
pub struct FdStdin {
    fd: RawFd,
}

impl FdStdin {
    pub fn new() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
        }
    }
}

impl Default for FdStdin {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinMode for FdStdin {
    fn set_nonblocking(&mut self, enabled: bool) -> nix::Result<()> {
        let bits = fcntl(self.fd, FcntlArg::F_GETFL)?;
        let mut flags = OFlag::from_bits_truncate(bits);
        flags.set(OFlag::O_NONBLOCK, enabled);
        fcntl(self.fd, FcntlArg::F_SETFL(flags))?;
        Ok(())
    }
}

/// Terminal output that may report `WouldBlock` and can wait until it
/// accepts bytes again.
pub trait TtyOutput: Write {
    fn wait_writable(&mut self) -> io::Result<()>;
}

/// Unbuffered writer for file descriptor 1.
///
/// Bypasses std's line buffering so every byte reaches the terminal when it
/// is written, and a would-block surfaces to the caller instead of sitting
/// in a buffer.
#[derive(Debug)]
pub struct RawStdout {
    stdout: Stdout,
}

impl RawStdout {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }
}

impl Default for RawStdout {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for RawStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        nix::unistd::write(self.stdout.as_fd(), buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TtyOutput for RawStdout {
    fn wait_writable(&mut self) -> io::Result<()> {
        let mut fds = [PollFd::new(self.stdout.as_fd(), PollFlags::POLLOUT)];
        loop {
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => return Ok(()),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Whether a write should give up or wait when the terminal is not ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blocked {
    Drop,
    Wait,
}

/// An active animation session on a terminal.
pub struct TerminalSession<W: TtyOutput, S: StdinMode> {
    out: W,
    stdin: S,
    active: bool,
}

impl<W: TtyOutput, S: StdinMode> TerminalSession<W, S> {
    /// Enter animation mode.
    ///
    /// Fails with [`SessionError::NotATty`] before touching anything when
    /// `is_tty` is false. Order: stdin non-blocking, save cursor, hide cursor,
    /// home, alternate screen, clear.
    pub fn prepare(out: W, mut stdin: S, is_tty: bool) -> Result<Self, SessionError> {
        if !is_tty {
            warn!("session:prepare stdout is not a tty");
            return Err(SessionError::NotATty);
        }

        stdin.set_nonblocking(true)?;

        // From here on, Drop restores whatever was changed.
        let mut session = Self {
            out,
            stdin,
            active: true,
        };
        let mut bytes = Vec::new();
        queue!(
            bytes,
            SaveCursor,
            cursor::Hide,
            CursorHome,
            PushScreen,
            terminal::Clear(terminal::ClearType::FromCursorDown)
        )?;
        session.send(&bytes, Blocked::Wait)?;

        debug!("session:prepare done");
        Ok(session)
    }

    /// Write one frame and move the cursor back home so the next frame
    /// overwrites it in place.
    ///
    /// Returns `false` when the terminal is not accepting output and the
    /// frame was skipped.
    pub fn draw_frame(&mut self, frame: &Frame) -> io::Result<bool> {
        let mut bytes = Vec::with_capacity(frame.len() + 3);
        queue!(bytes, Print(frame.as_str()), CursorHome)?;
        self.send(&bytes, Blocked::Drop)
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Leave animation mode: primary screen, restore cursor, show cursor,
    /// stdin blocking.
    ///
    /// Every step is attempted even if an earlier one fails; the first
    /// failure is returned. Subsequent calls do nothing.
    pub fn teardown(&mut self) -> Result<(), SessionError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let mut bytes = Vec::new();
        let screen = queue!(bytes, PopScreen, RestoreCursor, cursor::Show)
            .and_then(|()| self.send(&bytes, Blocked::Wait));
        let stdin = self.stdin.set_nonblocking(false);

        if let Err(e) = &screen {
            warn!(error = %e, "session:teardown failed to restore screen");
        }
        if let Err(e) = &stdin {
            warn!(error = %e, "session:teardown failed to restore stdin");
        }
        screen?;
        stdin?;

        debug!("session:teardown done");
        Ok(())
    }

    /// Write all of `bytes`. A write that would block before anything went
    /// out returns `false` under [`Blocked::Drop`]; once part of the buffer
    /// is on the terminal the rest is always waited for.
    fn send(&mut self, bytes: &[u8], blocked: Blocked) -> io::Result<bool> {
        let mut written = 0;
        while written < bytes.len() {
            match self.out.write(&bytes[written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if written == 0 && blocked == Blocked::Drop {
                        trace!("session:write would block, frame dropped");
                        return Ok(false);
                    }
                    self.out.wait_writable()?;
                }
                Err(e) => return Err(e),
            }
        }
        self.out.flush()?;
        Ok(true)
    }
}

impl<W: TtyOutput, S: StdinMode> Drop for TerminalSession<W, S> {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}
