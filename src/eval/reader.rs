use std::str::Chars;

use crate::eval::types::{EvalError, Value, MAX_NESTING};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Quote,
    Str(String),
    Atom(String),
}

struct Scan {
    tokens: Vec<Token>,
    open_string: bool,
}

/* Tokenizer */

// Returns None when the input ends inside the string.
fn tokenize_string(chars: &mut Chars) -> Option<String> {
    let mut token = String::new();
    let mut escaped = false;

    for ch in chars.by_ref() {
        if escaped {
            match ch {
                'n' => token.push('\n'),
                'r' => token.push('\r'),
                '0' => token.push('\0'),
                't' => token.push('\t'),
                _ => token.push(ch),
            }
            escaped = false;
        } else {
            match ch {
                '"' => return Some(token),
                '\\' => escaped = true,
                _ => token.push(ch),
            }
        }
    }
    None
}

fn ignore_line(chars: &mut Chars) {
    for ch in chars {
        if ch == '\n' {
            break;
        }
    }
}

#[inline(always)]
fn flush_token(token: &mut String, tokens: &mut Vec<Token>) {
    if !token.is_empty() {
        tokens.push(Token::Atom(std::mem::take(token)));
    }
}

fn tokenize(src: &str) -> Scan {
    let mut tokens = Vec::with_capacity(64);
    let mut chars = src.chars();
    let mut token = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            '(' => {
                flush_token(&mut token, &mut tokens);
                tokens.push(Token::Open);
            }
            ')' => {
                flush_token(&mut token, &mut tokens);
                tokens.push(Token::Close);
            }
            '\'' if token.is_empty() => tokens.push(Token::Quote),
            ' ' | '\n' | '\t' | '\r' | ',' => flush_token(&mut token, &mut tokens),
            ';' => {
                flush_token(&mut token, &mut tokens);
                ignore_line(&mut chars);
            }
            '"' => {
                flush_token(&mut token, &mut tokens);
                match tokenize_string(&mut chars) {
                    Some(s) => tokens.push(Token::Str(s)),
                    None => {
                        return Scan {
                            tokens,
                            open_string: true,
                        }
                    }
                }
            }
            _ => token.push(ch),
        }
    }

    flush_token(&mut token, &mut tokens);

    Scan {
        tokens,
        open_string: false,
    }
}

/* Parser */

fn read_atom(token: &str) -> Value {
    match token {
        "nil" => Value::Nil,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match token.parse::<f64>() {
            Ok(v) if token.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') => {
                Value::Number(v)
            }
            _ => Value::Symbol(token.to_string()),
        },
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn read_seq(&mut self, depth: usize) -> Result<Value, EvalError> {
        let mut seq = Vec::new();

        loop {
            match self.peek() {
                Some(Token::Close) => break,
                Some(_) => seq.push(self.read_form(depth)?),
                None => return Err(EvalError::Read("Unexpected EOF in read_seq".to_string())),
            }
        }
        self.next();

        Ok(Value::list(seq))
    }

    // `depth` counts the lists (quotes included) enclosing the next form.
    fn read_form(&mut self, depth: usize) -> Result<Value, EvalError> {
        match self.next() {
            Some(Token::Open | Token::Quote) if depth >= MAX_NESTING => {
                Err(EvalError::Read("nesting too deep".to_string()))
            }
            Some(Token::Close) => Err(EvalError::Read("Unexpected ')'".to_string())),
            Some(Token::Open) => self.read_seq(depth + 1),
            Some(Token::Quote) => {
                let quoted = self.read_form(depth + 1)?;
                Ok(Value::list(vec![Value::Symbol("quote".to_string()), quoted]))
            }
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::Atom(atom)) => Ok(read_atom(&atom)),
            None => Err(EvalError::Read("Unexpected EOF in read_form".to_string())),
        }
    }
}

// Positive while a list is still open. A stray ')' makes the input complete
// so the parser can report it.
fn open_depth(tokens: &[Token]) -> isize {
    let mut depth = 0isize;
    for token in tokens {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth < 0 {
                    return depth;
                }
            }
            _ => {}
        }
    }
    depth
}

/// Default cap on input buffered for an unfinished form.
pub const DEFAULT_MAX_PENDING: usize = 256 * 1024;

/// Line-oriented reader that buffers until every form is complete.
#[derive(Debug)]
pub struct Reader {
    buffer: String,
    max_pending: usize,
}

impl Default for Reader {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_PENDING)
    }
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader that gives up on a form once `max_pending` bytes are buffered.
    pub fn with_limit(max_pending: usize) -> Self {
        Self {
            buffer: String::new(),
            max_pending,
        }
    }

    /// Whether a multi-line form is waiting for more input.
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Drop any buffered partial input.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Feed one line and return every form completed by it.
    ///
    /// Returns no forms while a list or string is still open. Input beyond
    /// the pending limit discards the whole unfinished form.
    pub fn read_line(&mut self, line: &str) -> Result<Vec<Value>, EvalError> {
        if self.buffer.len() + line.len() + 1 > self.max_pending {
            self.buffer.clear();
            return Err(EvalError::Read(format!(
                "input exceeds {} bytes, discarded",
                self.max_pending
            )));
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');

        let scan = tokenize(&self.buffer);
        if scan.tokens.is_empty() && !scan.open_string {
            self.buffer.clear();
            return Ok(Vec::new());
        }
        if scan.open_string || open_depth(&scan.tokens) > 0 {
            return Ok(Vec::new());
        }
        self.buffer.clear();

        let mut parser = Parser {
            tokens: scan.tokens,
            pos: 0,
        };
        let mut forms = Vec::new();
        while parser.peek().is_some() {
            forms.push(parser.read_form(0)?);
        }
        Ok(forms)
    }
}
