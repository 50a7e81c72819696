//! Noir source tokenizer
//!
//! Consumes a raw byte stream and produces one token at a time.  The byte
//! level strips an optional UTF-8 BOM, rejects NUL bytes, folds all line
//! ending styles to LF, and discards `#` comments; a one-byte pushback
//! register provides the lookahead the multi-character tokens need.

use crate::error::{Error, ErrorKind, Result};
use std::io::Read;

/// Maximum number of characters in one token.
const MAX_TOKEN_CHARS: usize = 31;

const LF: u8 = 0x0a;
const CR: u8 = 0x0d;

/// A classified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input.
    Eof,
    /// An operator character that stands by itself.
    Atomic(u8),
    /// A pitch letter with its accidentals and register marks.
    Pitch(String),
    /// A rhythm digit with its optional suffix.
    Rhythm(String),
    /// A parameter operator and its payload (the text before the `;`).
    Param(u8, String),
    /// A key operator and its single key character.
    Key(u8, u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Line the token's first character was read on.
    pub line: i32,
}

/// Tokenizer over a byte stream.
pub struct Lexer<R: Read> {
    input: R,
    /// True until the first byte has been read (for BOM detection).
    first: bool,
    /// Previous raw byte, for folding CR LF and LF CR pairs.
    prev: Option<u8>,
    line: i32,
    pushback: Option<u8>,
}

impl<R: Read> Lexer<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            first: true,
            prev: None,
            line: 1,
            pushback: None,
        }
    }

    /// Current line number.
    pub fn line(&self) -> i32 {
        self.line
    }

    /// Read the next token.  End of input is reported as a successful
    /// [`TokenKind::Eof`] token.
    pub fn next_token(&mut self) -> Result<Token> {
        match self.token_inner() {
            Ok(tok) => Ok(tok),
            Err(kind) => Err(Error::Parse {
                line: self.line,
                kind,
            }),
        }
    }

    fn token_inner(&mut self) -> std::result::Result<Token, ErrorKind> {
        // Skip whitespace up to the first token character.
        let mut c = self.read_final()?;
        while let Some(b) = c {
            if !is_whitespace(b) {
                break;
            }
            c = self.read_final()?;
        }

        let line = self.line;
        let Some(b) = c else {
            return Ok(Token {
                kind: TokenKind::Eof,
                line,
            });
        };

        let kind = if is_atomic(b) {
            TokenKind::Atomic(b)
        } else if is_pitch_start(b) {
            TokenKind::Pitch(self.read_pitch(b)?)
        } else if b.is_ascii_digit() {
            TokenKind::Rhythm(self.read_rhythm(b)?)
        } else if is_param_op(b) {
            TokenKind::Param(b, self.read_param()?)
        } else if is_key_op(b) {
            let key = match self.read_final()? {
                Some(k) if is_printing(k) => k,
                _ => return Err(ErrorKind::KeyToken),
            };
            TokenKind::Key(b, key)
        } else {
            return Err(ErrorKind::BadChar);
        };

        Ok(Token { kind, line })
    }

    /// Pitch token: the letter, then accidentals, then register suffixes.
    fn read_pitch(&mut self, first: u8) -> std::result::Result<String, ErrorKind> {
        let mut text = String::new();
        text.push(first as char);

        loop {
            match self.read_final()? {
                Some(b) if is_accidental(b) => {
                    self.push_char(&mut text, b)?;
                }
                Some(b) => {
                    self.pushback(b);
                    break;
                }
                None => break,
            }
        }
        loop {
            match self.read_final()? {
                Some(b) if is_suffix(b) => {
                    self.push_char(&mut text, b)?;
                }
                Some(b) => {
                    self.pushback(b);
                    break;
                }
                None => break,
            }
        }

        Ok(text)
    }

    /// Rhythm token: the digit plus at most one suffix character.
    fn read_rhythm(&mut self, first: u8) -> std::result::Result<String, ErrorKind> {
        let mut text = String::new();
        text.push(first as char);
        match self.read_final()? {
            Some(b) if is_suffix(b) => text.push(b as char),
            Some(b) => self.pushback(b),
            None => {}
        }
        Ok(text)
    }

    /// Parameter payload: printing characters through the terminating `;`.
    fn read_param(&mut self) -> std::result::Result<String, ErrorKind> {
        // The operator character and the semicolon both count against the
        // token length limit.
        let mut payload = String::new();
        loop {
            match self.read_final()? {
                Some(b';') => break,
                Some(b) if is_printing(b) => {
                    if payload.len() + 2 >= MAX_TOKEN_CHARS {
                        return Err(ErrorKind::LongToken);
                    }
                    payload.push(b as char);
                }
                _ => return Err(ErrorKind::ParamTk),
            }
        }
        Ok(payload)
    }

    fn push_char(&mut self, text: &mut String, b: u8) -> std::result::Result<(), ErrorKind> {
        if text.len() >= MAX_TOKEN_CHARS {
            return Err(ErrorKind::LongToken);
        }
        text.push(b as char);
        Ok(())
    }

    fn pushback(&mut self, b: u8) {
        self.pushback = Some(b);
    }

    /// Read one byte with all filters applied: pushback replay, comment
    /// stripping, and line counting.
    fn read_final(&mut self) -> std::result::Result<Option<u8>, ErrorKind> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }

        let mut c = self.read_filtered()?;
        if c == Some(b'#') {
            loop {
                c = self.read_filtered()?;
                match c {
                    None | Some(LF) => break,
                    Some(_) => {}
                }
            }
        }
        if c == Some(LF) {
            if self.line == i32::MAX {
                return Err(ErrorKind::OverLine);
            }
            self.line += 1;
        }
        Ok(c)
    }

    /// Read one byte with the BOM, NUL, and line break filters applied.
    fn read_filtered(&mut self) -> std::result::Result<Option<u8>, ErrorKind> {
        loop {
            let Some(c) = self.read_raw()? else {
                return Ok(None);
            };
            if c == 0 {
                return Err(ErrorKind::NulChar);
            }

            if self.first {
                self.first = false;
                if c == 0xef {
                    // Must be a complete UTF-8 BOM, which is discarded.
                    if self.read_raw()? != Some(0xbb) {
                        return Err(ErrorKind::BadChar);
                    }
                    if self.read_raw()? != Some(0xbf) {
                        return Err(ErrorKind::BadChar);
                    }
                    continue;
                }
            }

            // A CR LF or LF CR pair is a single line break; the first byte
            // already reported it.
            if (c == LF && self.prev == Some(CR)) || (c == CR && self.prev == Some(LF)) {
                self.prev = None;
                continue;
            }
            self.prev = Some(c);

            return Ok(Some(if c == CR { LF } else { c }));
        }
    }

    fn read_raw(&mut self) -> std::result::Result<Option<u8>, ErrorKind> {
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => return Err(ErrorKind::IoRead),
            }
        }
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | LF | CR)
}

fn is_printing(b: u8) -> bool {
    (0x21..=0x7e).contains(&b)
}

/// Register or duration suffix character.
fn is_suffix(b: u8) -> bool {
    matches!(b, b'\'' | b',' | b'.')
}

fn is_accidental(b: u8) -> bool {
    matches!(b.to_ascii_lowercase(), b'x' | b's' | b'n' | b'h' | b't')
}

fn is_atomic(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')'
            | b'['
            | b']'
            | b'R'
            | b'r'
            | b'/'
            | b'$'
            | b'@'
            | b'{'
            | b':'
            | b'}'
            | b'='
            | b'~'
            | b'-'
    )
}

fn is_pitch_start(b: u8) -> bool {
    matches!(b, b'A'..=b'G' | b'a'..=b'g')
}

fn is_param_op(b: u8) -> bool {
    matches!(b, b'\\' | b'^' | b'&' | b'+' | b'`')
}

fn is_key_op(b: u8) -> bool {
    matches!(b, b'*' | b'!')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tokens(src: &[u8]) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(Cursor::new(src.to_vec()));
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().expect("token");
            let eof = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if eof {
                break;
            }
        }
        out
    }

    fn token_err(src: &[u8]) -> ErrorKind {
        let mut lexer = Lexer::new(Cursor::new(src.to_vec()));
        loop {
            match lexer.next_token() {
                Ok(tok) if tok.kind == TokenKind::Eof => panic!("no error in input"),
                Ok(_) => {}
                Err(e) => return e.kind().unwrap(),
            }
        }
    }

    #[test]
    fn test_pitch_with_accidentals_and_registers() {
        assert_eq!(
            tokens(b"cs' Dh,,"),
            vec![
                TokenKind::Pitch("cs'".into()),
                TokenKind::Pitch("Dh,,".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_rhythm_with_suffix() {
        assert_eq!(
            tokens(b"5 3' 2."),
            vec![
                TokenKind::Rhythm("5".into()),
                TokenKind::Rhythm("3'".into()),
                TokenKind::Rhythm("2.".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_param_and_key_tokens() {
        assert_eq!(
            tokens(b"^-2;*z!0"),
            vec![
                TokenKind::Param(b'^', "-2".into()),
                TokenKind::Key(b'*', b'z'),
                TokenKind::Key(b'!', b'0'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comment_runs_to_end_of_line() {
        assert_eq!(
            tokens(b"c # d e f\ng"),
            vec![
                TokenKind::Pitch("c".into()),
                TokenKind::Pitch("g".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_line_break_styles_count_once() {
        let mut lexer = Lexer::new(Cursor::new(b"c\r\nd\n\re\rf".to_vec()));
        let mut lines = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok.kind == TokenKind::Eof {
                break;
            }
            lines.push(tok.line);
        }
        assert_eq!(lines, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_bom_is_discarded() {
        assert_eq!(
            tokens(b"\xef\xbb\xbfc"),
            vec![TokenKind::Pitch("c".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_truncated_bom_rejected() {
        assert_eq!(token_err(b"\xef\xbbc"), ErrorKind::BadChar);
    }

    #[test]
    fn test_nul_byte_rejected() {
        assert_eq!(token_err(b"c\0d"), ErrorKind::NulChar);
    }

    #[test]
    fn test_unterminated_param_rejected() {
        assert_eq!(token_err(b"^12"), ErrorKind::ParamTk);
        assert_eq!(token_err(b"^1 2;"), ErrorKind::ParamTk);
    }

    #[test]
    fn test_overlong_token_rejected() {
        let mut src = b"c".to_vec();
        src.extend(std::iter::repeat(b's').take(40));
        assert_eq!(token_err(&src), ErrorKind::LongToken);
    }

    #[test]
    fn test_bad_character_rejected() {
        assert_eq!(token_err(b"%"), ErrorKind::BadChar);
    }
}
