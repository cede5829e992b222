//! Comment and docstring stripping for Python source.
//!
//! A small tokenizer walks the source tracking bracket depth, logical lines
//! and the indentation stack, the same structure Python's own tokenizer
//! exposes. Comment tokens are dropped outright. A string literal is dropped
//! when it is the first token of a statement: at the start of the file,
//! after a logical newline, after an indent or dedent, or after the colon
//! that opens a block on the same line (`def f(): "doc"`).
//!
//! Known imprecision: the docstring test is positional only. A bare string
//! statement that is not a docstring (for example a multi-line literal used
//! as a section marker) sits in the same position and is dropped too. This is
//! accepted behavior.
//!
//! Removed spans keep their line breaks so that the output has exactly the
//! same number of lines as the input.

use thiserror::Error;

/// Why the tokenizer gave up; callers fall back to the untransformed text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unterminated triple-quoted string starting on line {0}")]
    UnterminatedString(usize),
    #[error("unindent does not match any outer indentation level on line {0}")]
    InconsistentDedent(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Comment,
    String,
    Name,
    Number,
    Op,
    /// A `:` at bracket depth zero.
    Colon,
    /// End of a logical line.
    Newline,
    /// Line break that does not end a logical line.
    Nl,
    Indent,
    Dedent,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

/// Statement-opening keywords whose trailing colon starts a block.
const BLOCK_KEYWORDS: &[&str] = &[
    "def", "class", "async", "if", "elif", "else", "for", "while", "try", "except", "finally",
    "with", "match", "case",
];

const STRING_PREFIX: &[u8] = b"rRbBuUfF";

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    depth: usize,
    indents: Vec<usize>,
    at_line_start: bool,
    logical_line_open: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            depth: 0,
            indents: vec![0],
            at_line_start: true,
            logical_line_open: false,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        if !matches!(kind, TokenKind::Comment | TokenKind::Nl | TokenKind::Newline) {
            self.logical_line_open = true;
        }
        self.tokens.push(Token { kind, start, end });
    }

    fn tokenize(mut self) -> Result<Vec<Token>, TokenizeError> {
        while self.pos < self.bytes.len() {
            if self.at_line_start {
                self.at_line_start = false;
                self.read_indentation()?;
                continue;
            }
            let b = self.bytes[self.pos];
            match b {
                b' ' | b'\t' | b'\x0c' | b'\r' => self.pos += 1,
                b'\n' => self.newline(),
                b'#' => self.comment(),
                b'\\' if self.peek(1) == Some(b'\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                b'\\' if self.peek(1) == Some(b'\r') && self.peek(2) == Some(b'\n') => {
                    self.pos += 3;
                    self.line += 1;
                }
                b'"' | b'\'' => self.string(self.pos)?,
                b'0'..=b'9' => self.number(),
                b'.' if matches!(self.peek(1), Some(b'0'..=b'9')) => self.number(),
                b'(' | b'[' | b'{' => {
                    self.depth += 1;
                    self.push(TokenKind::Op, self.pos, self.pos + 1);
                    self.pos += 1;
                }
                b')' | b']' | b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    self.push(TokenKind::Op, self.pos, self.pos + 1);
                    self.pos += 1;
                }
                b':' if self.depth == 0 && self.peek(1) != Some(b'=') => {
                    self.push(TokenKind::Colon, self.pos, self.pos + 1);
                    self.pos += 1;
                }
                _ if is_ident_byte(b) => self.name_or_prefixed_string()?,
                _ => {
                    self.push(TokenKind::Op, self.pos, self.pos + 1);
                    self.pos += 1;
                }
            }
        }
        if self.logical_line_open {
            self.tokens.push(Token {
                kind: TokenKind::Newline,
                start: self.pos,
                end: self.pos,
            });
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.tokens.push(Token {
                kind: TokenKind::Dedent,
                start: self.pos,
                end: self.pos,
            });
        }
        Ok(self.tokens)
    }

    fn read_indentation(&mut self) -> Result<(), TokenizeError> {
        let mut col = 0usize;
        while let Some(b) = self.peek(0) {
            match b {
                b' ' => col += 1,
                b'\t' => col += 8 - col % 8,
                b'\x0c' => col = 0,
                _ => break,
            }
            self.pos += 1;
        }
        match self.peek(0) {
            // blank and comment-only lines never change indentation
            None | Some(b'\n') | Some(b'\r') | Some(b'#') => Ok(()),
            Some(_) => self.indent_to(col),
        }
    }

    fn indent_to(&mut self, col: usize) -> Result<(), TokenizeError> {
        let top = self.indents.last().copied().unwrap_or(0);
        if col > top {
            self.indents.push(col);
            self.push(TokenKind::Indent, self.pos, self.pos);
        } else if col < top {
            while self.indents.last().is_some_and(|&level| col < level) {
                self.indents.pop();
                self.tokens.push(Token {
                    kind: TokenKind::Dedent,
                    start: self.pos,
                    end: self.pos,
                });
            }
            if self.indents.last().copied().unwrap_or(0) != col {
                return Err(TokenizeError::InconsistentDedent(self.line));
            }
        }
        Ok(())
    }

    fn newline(&mut self) {
        let kind = if self.depth == 0 && self.logical_line_open {
            TokenKind::Newline
        } else {
            TokenKind::Nl
        };
        self.tokens.push(Token {
            kind,
            start: self.pos,
            end: self.pos + 1,
        });
        if kind == TokenKind::Newline {
            self.logical_line_open = false;
        }
        self.pos += 1;
        self.line += 1;
        self.at_line_start = self.depth == 0;
    }

    fn comment(&mut self) {
        let start = self.pos;
        while let Some(b) = self.peek(0) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        self.push(TokenKind::Comment, start, self.pos);
    }

    fn number(&mut self) {
        let start = self.pos;
        while let Some(b) = self.peek(0) {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start, self.pos);
    }

    fn name_or_prefixed_string(&mut self) -> Result<(), TokenizeError> {
        let start = self.pos;
        let mut end = self.pos;
        while end < self.bytes.len() && is_ident_byte(self.bytes[end]) {
            end += 1;
        }
        let ident = &self.bytes[start..end];
        let quoted = matches!(self.bytes.get(end), Some(b'"') | Some(b'\''));
        if quoted && ident.len() <= 2 && ident.iter().all(|b| STRING_PREFIX.contains(b)) {
            self.pos = end;
            return self.string(start);
        }
        self.pos = end;
        self.push(TokenKind::Name, start, end);
        Ok(())
    }

    /// Lex a string literal whose opening quote is at `self.pos`; `start`
    /// includes any prefix letters.
    fn string(&mut self, start: usize) -> Result<(), TokenizeError> {
        let quote = self.bytes[self.pos];
        let start_line = self.line;
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };
        loop {
            let Some(b) = self.peek(0) else {
                if triple {
                    return Err(TokenizeError::UnterminatedString(start_line));
                }
                break;
            };
            match b {
                b'\\' => {
                    if self.peek(1) == Some(b'\n') {
                        self.line += 1;
                    }
                    self.pos = (self.pos + 2).min(self.bytes.len());
                }
                b'\n' if !triple => break,
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                _ if b == quote => {
                    if !triple {
                        self.pos += 1;
                        break;
                    }
                    if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                        self.pos += 3;
                        break;
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        self.push(TokenKind::String, start, self.pos);
        Ok(())
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// Remove comments and statement-position strings from Python source.
pub fn strip(source: &str) -> Result<String, TokenizeError> {
    let tokens = Lexer::new(source).tokenize()?;

    let mut removed: Vec<(usize, usize)> = Vec::new();
    // `None` means start of file.
    let mut prev: Option<TokenKind> = None;
    let mut first_in_line = true;
    let mut opens_block = false;
    let mut after_block_colon = false;

    for tok in &tokens {
        match tok.kind {
            TokenKind::Comment => removed.push((tok.start, tok.end)),
            TokenKind::Nl => {}
            TokenKind::String => {
                let statement_start = matches!(
                    prev,
                    None | Some(TokenKind::Newline)
                        | Some(TokenKind::Indent)
                        | Some(TokenKind::Dedent)
                ) || (prev == Some(TokenKind::Colon) && after_block_colon);
                if statement_start {
                    removed.push((tok.start, tok.end));
                }
                first_in_line = false;
                prev = Some(TokenKind::String);
            }
            TokenKind::Name => {
                if first_in_line {
                    opens_block = BLOCK_KEYWORDS.contains(&&source[tok.start..tok.end]);
                }
                first_in_line = false;
                prev = Some(TokenKind::Name);
            }
            TokenKind::Newline => {
                first_in_line = true;
                opens_block = false;
                prev = Some(TokenKind::Newline);
            }
            TokenKind::Indent | TokenKind::Dedent => prev = Some(tok.kind),
            TokenKind::Colon => {
                // only the first depth-0 colon of a block line opens the block
                after_block_colon = opens_block;
                opens_block = false;
                first_in_line = false;
                prev = Some(TokenKind::Colon);
            }
            TokenKind::Number | TokenKind::Op => {
                first_in_line = false;
                prev = Some(tok.kind);
            }
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (start, end) in removed {
        out.push_str(&source[cursor..start]);
        out.extend(source[start..end].chars().filter(|&c| c == '\n'));
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}
