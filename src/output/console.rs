//! Serialized console writer
//!
//! All human-readable output goes through one `Console`, held behind the run
//! context's lock so lines from concurrent assemblies never interleave.

use std::io::{self, Write};

/// Colours used for console lines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Yellow,
    White,
}

impl Color {
    fn code(self) -> &'static str {
        match self {
            Color::Red => "\x1b[31m",
            Color::Yellow => "\x1b[33m",
            Color::White => "\x1b[1;37m",
        }
    }
}

/// Line-oriented writer with optional ANSI colouring
pub struct Console {
    out: Box<dyn Write + Send>,
    color: bool,
}

impl Console {
    pub fn stdout(color: bool) -> Self {
        Self::new(Box::new(io::stdout()), color)
    }

    pub fn new(out: Box<dyn Write + Send>, color: bool) -> Self {
        Self { out, color }
    }

    /// Write one line. Console write failures are not worth aborting a run.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", text.as_ref());
        let _ = self.out.flush();
    }

    /// Write one line in `color` (plain when colouring is off)
    pub fn colored(&mut self, color: Color, text: impl AsRef<str>) {
        if self.color {
            let line = format!("{}{}\x1b[0m", color.code(), text.as_ref());
            self.line(line);
        } else {
            self.line(text);
        }
    }

    pub fn blank(&mut self) {
        self.line("");
    }
}

/// In-memory writer for capturing console output in tests
#[cfg(test)]
#[derive(Clone, Default)]
pub struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn console(&self) -> Console {
        Console::new(Box::new(self.clone()), false)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
