//! Terminal output backends for the progress renderer
//!
//! [`AnsiTerminal`] redraws rows in place with cursor movement. [`BufferTerminal`]
//! keeps every frame in memory for headless runs and tests. [`NullTerminal`]
//! discards everything.

use super::layout::DEFAULT_WIDTH;
use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    queue,
    style::Print,
    terminal::{self, Clear, ClearType},
};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Frame-oriented output capability
pub trait TerminalRenderer: Send {
    /// Current width in columns
    fn width(&self) -> usize;

    /// Start a frame of `rows` lines
    fn begin_frame(&mut self, rows: usize) -> io::Result<()>;

    /// Write one row of the current frame
    fn draw_row(&mut self, line: &str) -> io::Result<()>;

    /// Finish the current frame
    fn end_frame(&mut self) -> io::Result<()>;

    /// Other output is about to use the terminal
    fn suspend(&mut self) -> io::Result<()>;

    /// Redrawing may continue below whatever was printed meanwhile
    fn resume(&mut self) -> io::Result<()>;
}

impl<T: TerminalRenderer + ?Sized> TerminalRenderer for Box<T> {
    fn width(&self) -> usize {
        (**self).width()
    }

    fn begin_frame(&mut self, rows: usize) -> io::Result<()> {
        (**self).begin_frame(rows)
    }

    fn draw_row(&mut self, line: &str) -> io::Result<()> {
        (**self).draw_row(line)
    }

    fn end_frame(&mut self) -> io::Result<()> {
        (**self).end_frame()
    }

    fn suspend(&mut self) -> io::Result<()> {
        (**self).suspend()
    }

    fn resume(&mut self) -> io::Result<()> {
        (**self).resume()
    }
}

/// In-place redraw using ANSI cursor control
///
/// The first frame after creation or resume reserves its rows with newlines; every
/// frame then moves the cursor up over them and reprints each line.
pub struct AnsiTerminal<W: Write + Send> {
    out: W,
    reserve: bool,
}

impl AnsiTerminal<io::Stdout> {
    /// Draw on standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> AnsiTerminal<W> {
    /// Draw on `out`
    pub fn new(out: W) -> Self {
        Self { out, reserve: true }
    }
}

impl<W: Write + Send> TerminalRenderer for AnsiTerminal<W> {
    fn width(&self) -> usize {
        match terminal::size() {
            Ok((cols, _)) if cols > 0 => usize::from(cols),
            _ => DEFAULT_WIDTH,
        }
    }

    fn begin_frame(&mut self, rows: usize) -> io::Result<()> {
        if rows == 0 {
            return Ok(());
        }
        if self.reserve {
            queue!(self.out, Print("\n".repeat(rows)))?;
            self.reserve = false;
        }
        let rows = u16::try_from(rows).unwrap_or(u16::MAX);
        queue!(self.out, MoveUp(rows))
    }

    fn draw_row(&mut self, line: &str) -> io::Result<()> {
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line),
            Print("\n")
        )
    }

    fn end_frame(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn suspend(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn resume(&mut self) -> io::Result<()> {
        self.reserve = true;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Capture {
    frames: Vec<Vec<String>>,
    current: Vec<String>,
    suspended: bool,
}

/// Captures frames in memory
///
/// Clones share the same buffer, so a test can keep one handle while the
/// renderer owns another.
#[derive(Clone, Debug)]
pub struct BufferTerminal {
    width: usize,
    capture: Arc<Mutex<Capture>>,
}

impl BufferTerminal {
    /// Buffer reporting a fixed `width`
    pub fn new(width: usize) -> Self {
        Self {
            width,
            capture: Arc::new(Mutex::new(Capture::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Capture> {
        self.capture.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every completed frame so far
    pub fn frames(&self) -> Vec<Vec<String>> {
        self.lock().frames.clone()
    }

    /// The most recent completed frame
    pub fn last_frame(&self) -> Option<Vec<String>> {
        self.lock().frames.last().cloned()
    }

    /// Whether the buffer is currently suspended
    pub fn is_suspended(&self) -> bool {
        self.lock().suspended
    }
}

impl TerminalRenderer for BufferTerminal {
    fn width(&self) -> usize {
        self.width
    }

    fn begin_frame(&mut self, rows: usize) -> io::Result<()> {
        let mut capture = self.lock();
        capture.current = Vec::with_capacity(rows);
        Ok(())
    }

    fn draw_row(&mut self, line: &str) -> io::Result<()> {
        self.lock().current.push(line.to_string());
        Ok(())
    }

    fn end_frame(&mut self) -> io::Result<()> {
        let mut capture = self.lock();
        let frame = std::mem::take(&mut capture.current);
        capture.frames.push(frame);
        Ok(())
    }

    fn suspend(&mut self) -> io::Result<()> {
        self.lock().suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> io::Result<()> {
        self.lock().suspended = false;
        Ok(())
    }
}

/// Discards all output
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTerminal;

impl TerminalRenderer for NullTerminal {
    fn width(&self) -> usize {
        DEFAULT_WIDTH
    }

    fn begin_frame(&mut self, _rows: usize) -> io::Result<()> {
        Ok(())
    }

    fn draw_row(&mut self, _line: &str) -> io::Result<()> {
        Ok(())
    }

    fn end_frame(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn suspend(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn resume(&mut self) -> io::Result<()> {
        Ok(())
    }
}
