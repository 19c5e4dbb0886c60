//! VT100 control sequences used by the terminal session.
//!
//! Crossterm ships its own commands for most of these, but several of its
//! encodings differ from the classic ones this program emits (it saves the
//! cursor with `ESC 7` and switches screens with mode 1049). The commands
//! here write the exact bytes, and plug into `crossterm::execute!` like any
//! built-in command. Cursor visibility and clearing reuse crossterm's own
//! `cursor::Hide`, `cursor::Show` and `terminal::Clear(FromCursorDown)`,
//! whose encodings already match.

use std::fmt;

use crossterm::Command;

/// Move the cursor to the top-left cell (`ESC[H`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorHome;

impl Command for CursorHome {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        f.write_str("\x1b[H")
    }
}

/// Move the cursor to a 1-based column and row (`ESC[<row>;<col>H`).
#[allow(dead_code)] // The loop only ever homes the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorMove {
    pub column: u16,
    pub row: u16,
}

impl Command for CursorMove {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(f, "\x1b[{};{}H", self.row, self.column)
    }
}

/// Save the cursor position (`ESC[s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveCursor;

impl Command for SaveCursor {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        f.write_str("\x1b[s")
    }
}

/// Restore the cursor position saved by [`SaveCursor`] (`ESC[u`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreCursor;

impl Command for RestoreCursor {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        f.write_str("\x1b[u")
    }
}

/// Switch to the alternate screen buffer (`ESC[?47h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushScreen;

impl Command for PushScreen {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        f.write_str("\x1b[?47h")
    }
}

/// Return to the primary screen buffer (`ESC[?47l`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopScreen;

impl Command for PopScreen {
    fn write_ansi(&self, f: &mut impl fmt::Write) -> fmt::Result {
        f.write_str("\x1b[?47l")
    }
}
