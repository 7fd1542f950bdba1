//! # MIPS32 Lexer
//!
//! Tokenizes one source file's text into a flat [`Token`] stream
//! (`tokenize`), and the [`Lexer`] on top of it stitches multiple files
//! together into a single logical stream so `.include` can splice an
//! included file's tokens in without the grammar driver needing to notice.
//!
//! ## Literals
//!
//! - Decimal and `0x`-prefixed hex integers, optionally signed: `-1`, `42`,
//!   `0xFF`
//! - Character literals: `'a'`, `'\n'`, `'\0'` — lexed directly to their
//!   integer value
//! - String literals with the same escape set as character literals
//!
//! Registers (`$t0`, `$sp`, `$5`, ...), directives (`.text`, ...) and
//! mnemonics (`addu`, ...) are all resolved against [`crate::reserved`]
//! while lexing, so the token stream already carries [`crate::opcode::Op`]
//! values rather than raw identifier text.

pub mod cursor;
pub mod token;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use crate::error::{AsmError, ErrorKind, Span};
use crate::reserved::{self, ReservedKind};
use cursor::Cursor;
use token::{Token, TokenKind};

pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<AsmError>,
}

fn process_escape_char(esc: char) -> Option<char> {
    match esc {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        '0' => Some('\0'),
        _ => None,
    }
}

/// Tokenize one file's worth of source text. Always terminates the stream
/// with a single `Eof` token.
#[must_use]
pub fn tokenize(source: &str) -> LexResult {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    loop {
        match lex_token(&mut cursor) {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => {
                if cursor.is_at_end() {
                    break;
                }
            }
            Err(err) => errors.push(err),
        }
    }

    let (l, c) = cursor.current_pos();
    tokens.push(Token {
        kind: TokenKind::Eof,
        lexeme: String::new(),
        span: Span::new(l, c),
    });

    LexResult { tokens, errors }
}

fn lex_token(cursor: &mut Cursor) -> Result<Option<Token>, AsmError> {
    while matches!(cursor.peek(), Some(' ' | '\t')) {
        cursor.advance();
    }

    if cursor.is_at_end() {
        return Ok(None);
    }

    let (sl, sc) = cursor.current_pos();
    let ch = cursor.peek().unwrap();

    match ch {
        '\n' | '\r' => lex_newline(cursor, sl, sc),
        '#' => lex_comment(cursor),
        ',' => simple(cursor, TokenKind::Comma, ","),
        ':' => simple(cursor, TokenKind::Colon, ":"),
        '(' => simple(cursor, TokenKind::LParen, "("),
        ')' => simple(cursor, TokenKind::RParen, ")"),
        '"' => lex_string(cursor, sl, sc),
        '\'' => lex_char(cursor, sl, sc),
        '$' => lex_register(cursor, sl, sc),
        '.' => lex_directive(cursor, sl, sc),
        c if c.is_ascii_digit() => lex_number(cursor, sl, sc),
        '-' if cursor.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => lex_number(cursor, sl, sc),
        c if c.is_ascii_alphabetic() || c == '_' => lex_word(cursor, sl, sc),
        _ => {
            cursor.advance();
            Err(AsmError::new(
                ErrorKind::LexInvalid(ch.to_string()),
                Span::new(sl, sc),
            ))
        }
    }
}

fn simple(cursor: &mut Cursor, kind: TokenKind, lexeme: &str) -> Result<Option<Token>, AsmError> {
    let (sl, sc) = cursor.current_pos();
    cursor.advance();
    Ok(Some(Token {
        kind,
        lexeme: lexeme.into(),
        span: Span::new(sl, sc),
    }))
}

fn lex_newline(cursor: &mut Cursor, sl: usize, sc: usize) -> Result<Option<Token>, AsmError> {
    if cursor.peek() == Some('\r') {
        cursor.advance();
        if cursor.peek() == Some('\n') {
            cursor.advance();
        }
    } else {
        cursor.advance();
    }
    Ok(Some(Token {
        kind: TokenKind::Newline,
        lexeme: "\n".into(),
        span: Span::new(sl, sc),
    }))
}

fn lex_comment(cursor: &mut Cursor) -> Result<Option<Token>, AsmError> {
    while let Some(ch) = cursor.peek() {
        if ch == '\n' || ch == '\r' {
            break;
        }
        cursor.advance();
    }
    Ok(None)
}

fn lex_string(cursor: &mut Cursor, sl: usize, sc: usize) -> Result<Option<Token>, AsmError> {
    cursor.advance();
    let mut processed = String::new();
    let mut raw = String::from("\"");

    loop {
        match cursor.peek() {
            None | Some('\n') | Some('\r') => {
                return Err(AsmError::new(
                    ErrorKind::LexInvalid("unterminated string literal".into()),
                    Span::new(sl, sc),
                ));
            }
            Some('"') => {
                cursor.advance();
                raw.push('"');
                break;
            }
            Some('\\') => {
                cursor.advance();
                raw.push('\\');
                let esc = cursor.peek().ok_or_else(|| {
                    AsmError::new(
                        ErrorKind::LexInvalid("unterminated string literal".into()),
                        Span::new(sl, sc),
                    )
                })?;
                match process_escape_char(esc) {
                    Some(resolved) => {
                        processed.push(resolved);
                        cursor.advance();
                        raw.push(esc);
                    }
                    None => {
                        return Err(AsmError::new(
                            ErrorKind::LexInvalid(format!("invalid escape sequence \\{esc}")),
                            Span::new(sl, sc),
                        ));
                    }
                }
            }
            Some(ch) => {
                cursor.advance();
                processed.push(ch);
                raw.push(ch);
            }
        }
    }

    Ok(Some(Token {
        kind: TokenKind::StringLiteral(processed),
        lexeme: raw,
        span: Span::new(sl, sc),
    }))
}

fn lex_char(cursor: &mut Cursor, sl: usize, sc: usize) -> Result<Option<Token>, AsmError> {
    cursor.advance();
    let value = match cursor.peek() {
        Some('\\') => {
            cursor.advance();
            let esc = cursor.peek().ok_or_else(|| {
                AsmError::new(
                    ErrorKind::LexInvalid("unterminated character literal".into()),
                    Span::new(sl, sc),
                )
            })?;
            let resolved = process_escape_char(esc).ok_or_else(|| {
                AsmError::new(
                    ErrorKind::LexInvalid(format!("invalid escape sequence \\{esc}")),
                    Span::new(sl, sc),
                )
            })?;
            cursor.advance();
            resolved as i64
        }
        Some(ch) => {
            cursor.advance();
            ch as i64
        }
        None => {
            return Err(AsmError::new(
                ErrorKind::LexInvalid("unterminated character literal".into()),
                Span::new(sl, sc),
            ));
        }
    };

    if cursor.peek() != Some('\'') {
        return Err(AsmError::new(
            ErrorKind::LexInvalid("unterminated character literal".into()),
            Span::new(sl, sc),
        ));
    }
    cursor.advance();

    Ok(Some(Token {
        kind: TokenKind::IntLiteral(value),
        lexeme: format!("'{value}'"),
        span: Span::new(sl, sc),
    }))
}

fn lex_register(cursor: &mut Cursor, sl: usize, sc: usize) -> Result<Option<Token>, AsmError> {
    let mut raw = String::from("$");
    cursor.advance();
    while matches!(cursor.peek(), Some(c) if c.is_ascii_alphanumeric()) {
        raw.push(cursor.advance().unwrap());
    }

    match reserved::lookup(&raw) {
        Some(entry) => match entry.kind {
            ReservedKind::Register(n) => Ok(Some(Token {
                kind: TokenKind::Register(n),
                lexeme: raw,
                span: Span::new(sl, sc),
            })),
            _ => Err(AsmError::new(ErrorKind::LexInvalid(raw), Span::new(sl, sc))),
        },
        None => Err(AsmError::new(
            ErrorKind::LexInvalid(format!("unknown register {raw}")),
            Span::new(sl, sc),
        )),
    }
}

fn lex_directive(cursor: &mut Cursor, sl: usize, sc: usize) -> Result<Option<Token>, AsmError> {
    let mut raw = String::from(".");
    cursor.advance();
    while matches!(cursor.peek(), Some(c) if c.is_ascii_alphabetic()) {
        raw.push(cursor.advance().unwrap());
    }

    match reserved::lookup(&raw) {
        Some(entry) => match entry.kind {
            ReservedKind::Directive(op) => Ok(Some(Token {
                kind: TokenKind::Directive(op),
                lexeme: raw,
                span: Span::new(sl, sc),
            })),
            _ => Err(AsmError::new(
                ErrorKind::LexInvalid(format!("unknown directive {raw}")),
                Span::new(sl, sc),
            )),
        },
        None => Err(AsmError::new(
            ErrorKind::LexInvalid(format!("unknown directive {raw}")),
            Span::new(sl, sc),
        )),
    }
}

fn lex_number(cursor: &mut Cursor, sl: usize, sc: usize) -> Result<Option<Token>, AsmError> {
    let mut raw = String::new();
    if cursor.peek() == Some('-') {
        raw.push(cursor.advance().unwrap());
    }

    if cursor.peek() == Some('0') && matches!(cursor.peek_at(1), Some('x') | Some('X')) {
        raw.push(cursor.advance().unwrap());
        raw.push(cursor.advance().unwrap());
        let mut digits = String::new();
        while matches!(cursor.peek(), Some(c) if c.is_ascii_hexdigit()) {
            digits.push(cursor.advance().unwrap());
        }
        if digits.is_empty() {
            return Err(AsmError::new(
                ErrorKind::LexInvalid(format!("expected hex digits after {raw}")),
                Span::new(sl, sc),
            ));
        }
        raw.push_str(&digits);
        let magnitude = u128::from_str_radix(&digits, 16).map_err(|_| {
            AsmError::new(ErrorKind::LexInvalid(format!("invalid hex literal {raw}")), Span::new(sl, sc))
        })?;
        let negative = raw.starts_with('-');
        let value = check_32bit_magnitude(magnitude, negative, &raw, sl, sc)?;
        return Ok(Some(Token {
            kind: TokenKind::IntLiteral(value),
            lexeme: raw,
            span: Span::new(sl, sc),
        }));
    }

    let mut digits = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_ascii_digit()) {
        digits.push(cursor.advance().unwrap());
    }
    raw.push_str(&digits);
    let magnitude = digits.parse::<u128>().map_err(|_| {
        AsmError::new(ErrorKind::LexInvalid(format!("invalid decimal literal {raw}")), Span::new(sl, sc))
    })?;
    let negative = raw.starts_with('-');
    let value = check_32bit_magnitude(magnitude, negative, &raw, sl, sc)?;

    Ok(Some(Token {
        kind: TokenKind::IntLiteral(value),
        lexeme: raw,
        span: Span::new(sl, sc),
    }))
}

/// §4.1: "negative magnitudes greater than 2^31 or unsigned magnitudes
/// greater than 2^32-1" overflow. Checked against `u128` so the comparison
/// itself can't overflow regardless of how many digits were lexed.
fn check_32bit_magnitude(magnitude: u128, negative: bool, raw: &str, sl: usize, sc: usize) -> Result<i64, AsmError> {
    let limit = if negative { 1u128 << 31 } else { (1u128 << 32) - 1 };
    if magnitude > limit {
        return Err(AsmError::new(
            ErrorKind::LexInvalid(format!("integer literal {raw} out of 32-bit range")),
            Span::new(sl, sc),
        ));
    }
    let value = magnitude as i64;
    Ok(if negative { -value } else { value })
}

fn lex_word(cursor: &mut Cursor, sl: usize, sc: usize) -> Result<Option<Token>, AsmError> {
    let mut word = String::new();
    while matches!(cursor.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
        word.push(cursor.advance().unwrap());
    }

    let kind = match reserved::lookup(&word) {
        Some(entry) => match entry.kind {
            ReservedKind::Mnemonic(op) => TokenKind::Mnemonic(op),
            ReservedKind::Directive(op) => TokenKind::Directive(op),
            ReservedKind::Register(n) => TokenKind::Register(n),
        },
        None => TokenKind::Identifier(word.clone()),
    };

    Ok(Some(Token {
        kind,
        lexeme: word,
        span: Span::new(sl, sc),
    }))
}

/// One open source file: its token stream and the read cursor into it.
struct SourceFrame {
    path: Option<PathBuf>,
    tokens: Vec<Token>,
    pos: usize,
}

/// Stitches together the token streams of the command-line source file(s)
/// and any files pulled in with `.include`, presenting them to the grammar
/// driver as one continuous stream. Each `.include` pushes a new frame;
/// reaching a frame's `Eof` pops it and resumes the frame underneath,
/// except at the bottom of the stack, where `Eof` is the real end of input.
pub struct Lexer {
    frames: Vec<SourceFrame>,
}

fn tag(err: AsmError, path: &Option<PathBuf>) -> AsmError {
    match path {
        Some(p) => err.with_file(p.clone()),
        None => err,
    }
}

impl Lexer {
    pub fn new(path: Option<PathBuf>, source: &str) -> (Self, Vec<AsmError>) {
        let LexResult { tokens, errors } = tokenize(source);
        let errors = errors.into_iter().map(|e| tag(e, &path)).collect();
        let lexer = Self {
            frames: vec![SourceFrame { path, tokens, pos: 0 }],
        };
        (lexer, errors)
    }

    /// Stitches several top-level files into one stream, processed in
    /// order: the first file's frame sits on top of the stack so it is
    /// read first, and each `Eof` pops into the next file, same as an
    /// exhausted `.include` frame resuming its parent.
    pub fn new_multi(files: Vec<(Option<PathBuf>, String)>) -> (Self, Vec<AsmError>) {
        let mut frames = Vec::with_capacity(files.len().max(1));
        let mut errors = Vec::new();
        for (path, source) in &files {
            let LexResult { tokens, errors: file_errors } = tokenize(source);
            errors.extend(file_errors.into_iter().map(|e| tag(e, path)));
            frames.push(SourceFrame { path: path.clone(), tokens, pos: 0 });
        }
        if frames.is_empty() {
            frames.push(SourceFrame { path: None, tokens: tokenize("").tokens, pos: 0 });
        }
        frames.reverse();
        (Self { frames }, errors)
    }

    /// Directory `.include` targets are resolved relative to: the directory
    /// containing the file currently being lexed, falling back to the
    /// current working directory for sources with no path (e.g. stdin).
    fn include_base_dir(&self) -> PathBuf {
        self.frames
            .last()
            .and_then(|f| f.path.as_deref())
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Open and push `raw_path` as a new frame on top of the stack. Lex
    /// errors found while tokenizing the included file are appended to
    /// `errors` rather than returned, mirroring how errors accumulate for
    /// the top-level source.
    pub fn open_include(&mut self, raw_path: &str, span: Span, errors: &mut Vec<AsmError>) -> Result<(), AsmError> {
        let resolved = self.include_base_dir().join(raw_path);
        let source = std::fs::read_to_string(&resolved)
            .map_err(|_| AsmError::new(ErrorKind::IncludeOpenFailed(raw_path.to_string()), span))?;
        let LexResult { tokens, errors: lex_errors } = tokenize(&source);
        errors.extend(lex_errors.into_iter().map(|e| e.with_file(resolved.clone())));
        self.frames.push(SourceFrame {
            path: Some(resolved),
            tokens,
            pos: 0,
        });
        Ok(())
    }

    /// Pull the next token, transparently popping exhausted `.include`
    /// frames. Calling this past the true end of input keeps returning
    /// `Eof`.
    pub fn next(&mut self) -> Token {
        loop {
            let frame = self.frames.last_mut().expect("lexer frame stack is never empty");
            if frame.pos + 1 < frame.tokens.len() {
                let tok = frame.tokens[frame.pos].clone();
                frame.pos += 1;
                return tok;
            }
            if self.frames.len() > 1 {
                self.frames.pop();
                continue;
            }
            return frame.tokens[frame.pos].clone();
        }
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        self.frames.last().and_then(|f| f.path.clone())
    }
}
