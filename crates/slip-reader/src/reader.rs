//! Reader: source text to symbolic data.

use slip_core::{Heap, Symbol, Value};
use thiserror::Error;

use crate::stream::{Position, Stream};

/// Errors that can occur while reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expecting '{expected}' at {position}")]
    Expected { expected: char, position: Position },

    #[error("unexpected '{found}' at {position}")]
    UnexpectedChar { found: char, position: Position },

    #[error("unexpected end of input at {position}")]
    UnexpectedEof { position: Position },

    #[error("character names not supported: {name} at {position}")]
    CharacterName { name: String, position: Position },

    #[error("unsupported sharp syntax: #{found} at {position}")]
    UnsupportedSharp { found: String, position: Position },

    #[error("comma outside quasiquote at {position}")]
    CommaOutsideQuasiquote { position: Position },

    #[error("dot without a preceding element at {position}")]
    MisplacedDot { position: Position },
}

impl ParseError {
    /// Where in the source the error was detected.
    pub fn position(&self) -> Position {
        match self {
            ParseError::Expected { position, .. }
            | ParseError::UnexpectedChar { position, .. }
            | ParseError::UnexpectedEof { position }
            | ParseError::CharacterName { position, .. }
            | ParseError::UnsupportedSharp { position, .. }
            | ParseError::CommaOutsideQuasiquote { position }
            | ParseError::MisplacedDot { position } => *position,
        }
    }
}

/// Result of reading one token: a form, or a comment to be dropped.
enum Token {
    Form(Value),
    Comment,
}

/// Reader over one source text.
pub struct Reader<'h> {
    stream: Stream,
    heap: &'h mut Heap,
    /// Quasiquote nesting depth; commas are only legal while positive.
    qq_depth: usize,
    quote: Symbol,
    quasiquote: Symbol,
    unquote: Symbol,
    splice: Symbol,
}

impl<'h> Reader<'h> {
    pub fn new(heap: &'h mut Heap, text: &str) -> Self {
        let quote = heap.intern("quote");
        let quasiquote = heap.intern("quasiquote");
        let unquote = heap.intern("qq-unquote");
        let splice = heap.intern("qq-splice");
        Self {
            stream: Stream::new(text),
            heap,
            qq_depth: 0,
            quote,
            quasiquote,
            unquote,
            splice,
        }
    }

    /// Read the whole text as the elements of one implicit list.
    pub fn read_all(mut self) -> Result<Value, ParseError> {
        let forms = self.read_elements(false)?;
        self.skip_whitespace();
        match self.stream.peek() {
            Some(found) => Err(ParseError::UnexpectedChar {
                found,
                position: self.stream.position(),
            }),
            None => Ok(forms),
        }
    }

    /// Read the next form, skipping comments.
    pub fn read_form(&mut self) -> Result<Value, ParseError> {
        loop {
            if let Token::Form(form) = self.read_token()? {
                return Ok(form);
            }
        }
    }

    fn read_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();
        let position = self.stream.position();
        match self.stream.peek() {
            None => Err(ParseError::UnexpectedEof { position }),
            Some('"') => self.read_string().map(Token::Form),
            Some('(') => {
                self.stream.next();
                self.read_elements(true).map(Token::Form)
            }
            Some(';') => {
                self.stream.read_while(|ch| ch != '\n');
                Ok(Token::Comment)
            }
            Some('#') => self.read_sharp().map(Token::Form),
            Some('`') => self.read_quasiquote().map(Token::Form),
            Some(',') => self.read_comma().map(Token::Form),
            Some('\'') => {
                self.stream.next();
                let form = self.read_form()?;
                Ok(Token::Form(self.heap.list(vec![Value::Symbol(self.quote), form])))
            }
            Some(_) => self.read_symbol().map(Token::Form),
        }
    }

    /// Read list elements after an opening parenthesis (or at top level).
    ///
    /// End of input ends the list without an error.
    fn read_elements(&mut self, closing: bool) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        let mut tail = Value::Nil;
        loop {
            self.skip_whitespace();
            match self.stream.peek() {
                None => break,
                Some(')') => {
                    if closing {
                        self.stream.next();
                    }
                    break;
                }
                Some('.') if self.at_dot_marker() => {
                    let position = self.stream.position();
                    self.stream.next();
                    if items.is_empty() {
                        return Err(ParseError::MisplacedDot { position });
                    }
                    tail = self.read_form()?;
                    self.skip_whitespace();
                    match self.stream.peek() {
                        None => {}
                        Some(')') => {
                            if closing {
                                self.stream.next();
                            }
                        }
                        Some(_) => {
                            return Err(ParseError::Expected {
                                expected: ')',
                                position: self.stream.position(),
                            });
                        }
                    }
                    break;
                }
                Some(_) => {
                    if let Token::Form(form) = self.read_token()? {
                        items.push(form);
                    }
                }
            }
        }
        Ok(self.heap.list_with_tail(items, tail))
    }

    /// A lone `.` separates the final cdr; `.5` or `...` start a token.
    fn at_dot_marker(&self) -> bool {
        match self.stream.peek_second() {
            None => true,
            Some(ch) => ch.is_whitespace() || ch == '(' || ch == ')',
        }
    }

    fn read_string(&mut self) -> Result<Value, ParseError> {
        self.stream.next();
        let mut buf = String::new();
        loop {
            match self.stream.next() {
                Some('"') => break,
                Some('\\') => match self.stream.next() {
                    Some(ch) => buf.push(ch),
                    None => return Err(self.expected('"')),
                },
                Some(ch) => buf.push(ch),
                None => return Err(self.expected('"')),
            }
        }
        Ok(Value::string(&buf))
    }

    fn read_symbol(&mut self) -> Result<Value, ParseError> {
        let position = self.stream.position();
        let token = self.stream.read_while(is_symbol_char);
        if token.is_empty() {
            return Err(match self.stream.peek() {
                Some(found) => ParseError::UnexpectedChar { found, position },
                None => ParseError::UnexpectedEof { position },
            });
        }
        if is_number(&token) {
            if let Ok(n) = token.parse::<f64>() {
                return Ok(Value::Number(n));
            }
        }
        Ok(self.heap.symbol(&token))
    }

    fn read_sharp(&mut self) -> Result<Value, ParseError> {
        let position = self.stream.position();
        self.stream.next();
        match self.stream.peek() {
            Some('\\') => {
                self.stream.next();
                self.read_char(position)
            }
            Some('(') => {
                self.stream.next();
                let list = self.read_elements(true)?;
                let (items, _) = self.heap.split_list(&list);
                Ok(self.heap.array(items))
            }
            other => Err(ParseError::UnsupportedSharp {
                found: other.map(String::from).unwrap_or_default(),
                position,
            }),
        }
    }

    fn read_char(&mut self, position: Position) -> Result<Value, ParseError> {
        let Some(first) = self.stream.next() else {
            return Err(ParseError::UnexpectedEof {
                position: self.stream.position(),
            });
        };
        let rest = self
            .stream
            .read_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !rest.is_empty() {
            return Err(ParseError::CharacterName {
                name: format!("{}{}", first, rest),
                position,
            });
        }
        Ok(Value::Char(first))
    }

    fn read_quasiquote(&mut self) -> Result<Value, ParseError> {
        self.stream.next();
        self.skip_whitespace();
        if self.stream.peek() != Some('(') {
            let form = self.read_form()?;
            return Ok(self.heap.list(vec![Value::Symbol(self.quote), form]));
        }
        self.qq_depth += 1;
        let form = self.read_form();
        self.qq_depth -= 1;
        let form = form?;
        Ok(self.heap.list(vec![Value::Symbol(self.quasiquote), form]))
    }

    fn read_comma(&mut self) -> Result<Value, ParseError> {
        let position = self.stream.position();
        if self.qq_depth == 0 {
            return Err(ParseError::CommaOutsideQuasiquote { position });
        }
        self.stream.next();
        self.skip_whitespace();
        let head = if self.stream.peek() == Some('@') {
            self.stream.next();
            self.splice
        } else {
            self.unquote
        };
        self.qq_depth -= 1;
        let form = self.read_form();
        self.qq_depth += 1;
        let form = form?;
        Ok(self.heap.list(vec![Value::Symbol(head), form]))
    }

    fn skip_whitespace(&mut self) {
        self.stream.read_while(char::is_whitespace);
    }

    fn expected(&self, expected: char) -> ParseError {
        ParseError::Expected {
            expected,
            position: self.stream.position(),
        }
    }
}

/// Check if a character may appear in a symbol or number token.
fn is_symbol_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "%$_-:.+*@!?&=<>[]{}/".contains(ch)
}

/// Digits with at most one dot, and at least one digit.
fn is_number(token: &str) -> bool {
    token.chars().any(|ch| ch.is_ascii_digit())
        && token.chars().all(|ch| ch.is_ascii_digit() || ch == '.')
        && token.chars().filter(|&ch| ch == '.').count() <= 1
}

/// Parse source text into the list of its top-level forms.
pub fn parse(heap: &mut Heap, text: &str) -> Result<Value, ParseError> {
    Reader::new(heap, text).read_all()
}
