//! Character stream with position tracking.

use std::fmt;

/// Position in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Character offset from the start of the text.
    pub offset: usize,
    /// 0-indexed line number.
    pub line: usize,
    /// 0-indexed column number.
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Returns the 1-indexed line number.
    pub fn line_number(&self) -> usize {
        self.line + 1
    }

    /// Returns the 1-indexed column number.
    pub fn column_number(&self) -> usize {
        self.column + 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (offset {})",
            self.line_number(),
            self.column_number(),
            self.offset
        )
    }
}

/// Immutable text with a forward-only cursor.
#[derive(Debug, Clone)]
pub struct Stream {
    chars: Vec<char>,
    position: Position,
}

impl Stream {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            position: Position::default(),
        }
    }

    /// Current cursor position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Peek at the next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.position.offset).copied()
    }

    /// Peek one character past the next.
    pub fn peek_second(&self) -> Option<char> {
        self.chars.get(self.position.offset + 1).copied()
    }

    /// Consume the next character.
    pub fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position.offset += 1;
        if ch == '\n' {
            self.position.line += 1;
            self.position.column = 0;
        } else {
            self.position.column += 1;
        }
        Some(ch)
    }

    /// Consume characters while `pred` holds.
    pub fn read_while(&mut self, mut pred: impl FnMut(char) -> bool) -> String {
        let mut buf = String::new();
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            buf.push(ch);
            self.next();
        }
        buf
    }

    pub fn is_eof(&self) -> bool {
        self.position.offset >= self.chars.len()
    }
}
