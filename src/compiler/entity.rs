//! Entity interpreter
//!
//! Reads tokens and converts them into virtual machine operations: pitch
//! entities become pitch sets, rhythm entities become durations, and
//! everything else dispatches to the matching operator.

use super::lexer::{Lexer, Token, TokenKind};
use super::pitch::PitchSet;
use super::vm::{Vm, MAX_CUE};
use crate::error::{Error, ErrorKind, Result};
use std::io::Read;

/// Base quanta per rhythm digit 1-9 (index 0 unused; digit 0 is a grace
/// note).
const RHYTHM_BASE: [i32; 10] = [0, 6, 12, 24, 48, 96, 192, 384, 32, 64];

/// Interpret the whole token stream, driving the virtual machine, and hand
/// the machine its end-of-input operation.
pub fn run<R: Read>(lexer: &mut Lexer<R>, vm: &mut Vm) -> Result<()> {
    loop {
        let tok = lexer.next_token()?;
        if interpret(tok, lexer, vm)? {
            return Ok(());
        }
    }
}

/// Interpret one top-level token.  Returns true at end of input.
fn interpret<R: Read>(tok: Token, lexer: &mut Lexer<R>, vm: &mut Vm) -> Result<bool> {
    let line = tok.line;
    let at = |kind: ErrorKind| Error::Parse { line, kind };

    match tok.kind {
        TokenKind::Eof => {
            vm.eof().map_err(at)?;
            Ok(true)
        }
        TokenKind::Atomic(b')') | TokenKind::Atomic(b']') => Err(at(ErrorKind::Right)),
        TokenKind::Atomic(b'R') | TokenKind::Atomic(b'r') => {
            vm.pitch_set(PitchSet::new()).map_err(at)?;
            Ok(false)
        }
        TokenKind::Atomic(b'(') => {
            let ps = pitch_group(lexer)?;
            vm.pitch_set(ps).map_err(at)?;
            Ok(false)
        }
        TokenKind::Pitch(text) => {
            let mut ps = PitchSet::new();
            ps.add(decode_pitch(&text).map_err(at)?);
            vm.pitch_set(ps).map_err(at)?;
            Ok(false)
        }
        TokenKind::Atomic(b'[') => {
            let q = rhythm_group(lexer)?;
            vm.duration(q).map_err(at)?;
            Ok(false)
        }
        TokenKind::Rhythm(text) => {
            let q = decode_dur(&text).map_err(at)?;
            vm.duration(q).map_err(at)?;
            Ok(false)
        }
        kind => {
            operator(kind, vm).map_err(at)?;
            Ok(false)
        }
    }
}

/// Read the remainder of a parenthesized pitch group.  Rests inside the
/// group contribute nothing; nested groups only track depth.
fn pitch_group<R: Read>(lexer: &mut Lexer<R>) -> Result<PitchSet> {
    let mut ps = PitchSet::new();
    let mut depth: i32 = 1;

    while depth > 0 {
        let tok = lexer.next_token()?;
        let line = tok.line;
        let at = |kind: ErrorKind| Error::Parse { line, kind };
        match tok.kind {
            TokenKind::Atomic(b'(') => {
                depth = depth.checked_add(1).ok_or_else(|| at(ErrorKind::TooDeep))?;
            }
            TokenKind::Atomic(b')') => {
                depth -= 1;
            }
            TokenKind::Atomic(b'R') | TokenKind::Atomic(b'r') => {}
            TokenKind::Pitch(text) => {
                ps.add(decode_pitch(&text).map_err(at)?);
            }
            _ => return Err(at(ErrorKind::Unclosed)),
        }
    }

    Ok(ps)
}

/// Read the remainder of a bracketed rhythm group and sum its durations.
fn rhythm_group<R: Read>(lexer: &mut Lexer<R>) -> Result<i32> {
    let mut total: i32 = 0;
    let mut any = false;
    let mut depth: i32 = 1;
    let mut line = 0;

    while depth > 0 {
        let tok = lexer.next_token()?;
        line = tok.line;
        let at = |kind: ErrorKind| Error::Parse { line, kind };
        match tok.kind {
            TokenKind::Atomic(b'[') => {
                depth = depth.checked_add(1).ok_or_else(|| at(ErrorKind::TooDeep))?;
            }
            TokenKind::Atomic(b']') => {
                depth -= 1;
            }
            TokenKind::Rhythm(text) => {
                let q = decode_dur(&text).map_err(at)?;
                if q == 0 {
                    return Err(at(ErrorKind::InGrace));
                }
                total = total.checked_add(q).ok_or_else(|| at(ErrorKind::LongDur))?;
                any = true;
            }
            _ => return Err(at(ErrorKind::Unclosed)),
        }
    }

    if !any {
        return Err(Error::Parse {
            line,
            kind: ErrorKind::BadDur,
        });
    }
    Ok(total)
}

/// Dispatch an operator token to the virtual machine.
fn operator(kind: TokenKind, vm: &mut Vm) -> std::result::Result<(), ErrorKind> {
    match kind {
        TokenKind::Atomic(b'/') => vm.repeat(),
        TokenKind::Atomic(b'$') => vm.section(),
        TokenKind::Atomic(b'@') => vm.rewind(),
        TokenKind::Atomic(b'{') => vm.push_loc(),
        TokenKind::Atomic(b':') => vm.return_loc(),
        TokenKind::Atomic(b'}') => vm.pop_loc(),
        TokenKind::Atomic(b'=') => vm.pop_trans(),
        TokenKind::Atomic(b'~') => vm.pop_art(),
        TokenKind::Atomic(b'-') => vm.pop_layer(),
        TokenKind::Param(b'\\', payload) => vm.multiple(parse_i32(&payload)?),
        TokenKind::Param(b'^', payload) => vm.push_trans(parse_i32(&payload)?),
        TokenKind::Param(b'&', payload) => vm.set_base_layer(parse_i32(&payload)?),
        TokenKind::Param(b'+', payload) => vm.push_layer(parse_i32(&payload)?),
        TokenKind::Param(b'`', payload) => {
            let num = parse_i32(&payload)?;
            if !(0..=MAX_CUE).contains(&num) {
                return Err(ErrorKind::CueNum);
            }
            vm.cue(num)
        }
        TokenKind::Key(b'*', key) => vm.imm_art(key_value(key)?),
        TokenKind::Key(b'!', key) => vm.push_art(key_value(key)?),
        _ => unreachable!("token classes are exhaustive"),
    }
}

/// Decode a single pitch token into semitones from middle C.
///
/// The letter picks the base pitch (upper case an octave below lower case);
/// each following character applies an accidental or register shift.
fn decode_pitch(text: &str) -> std::result::Result<i16, ErrorKind> {
    let bytes = text.as_bytes();
    let mut pitch: i32 = match bytes[0] {
        b'C' => -12,
        b'D' => -10,
        b'E' => -8,
        b'F' => -7,
        b'G' => -5,
        b'A' => -3,
        b'B' => -1,
        b'c' => 0,
        b'd' => 2,
        b'e' => 4,
        b'f' => 5,
        b'g' => 7,
        b'a' => 9,
        b'b' => 11,
        _ => return Err(ErrorKind::BadPitch),
    };

    for &b in &bytes[1..] {
        pitch += match b.to_ascii_lowercase() {
            b'x' => 2,
            b's' => 1,
            b'n' => 0,
            b'h' => -1,
            b't' => -2,
            b'\'' => 12,
            b',' => -12,
            _ => return Err(ErrorKind::BadPitch),
        };
    }

    if !(-39..=48).contains(&pitch) {
        return Err(ErrorKind::PitchR);
    }
    Ok(pitch as i16)
}

/// Decode a rhythm token into quanta.  Zero means a grace note.
fn decode_dur(text: &str) -> std::result::Result<i32, ErrorKind> {
    let bytes = text.as_bytes();
    let digit = (bytes[0] - b'0') as usize;
    let base = RHYTHM_BASE[digit];

    match bytes.get(1).copied() {
        None => Ok(base),
        Some(_) if base == 0 => Err(ErrorKind::BadDur),
        Some(b'\'') => Ok(base * 2),
        Some(b'.') => Ok(base * 3 / 2),
        Some(b',') => Ok(base / 2),
        Some(_) => Err(ErrorKind::BadDur),
    }
}

/// Parse a signed 32-bit parameter payload.
fn parse_i32(payload: &str) -> std::result::Result<i32, ErrorKind> {
    let bytes = payload.as_bytes();
    let (neg, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    if digits.is_empty() {
        return Err(ErrorKind::BadOp);
    }

    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(ErrorKind::BadOp);
        }
        value = value * 10 + (b - b'0') as i64;
        if value > (1 << 31) {
            return Err(ErrorKind::BadOp);
        }
    }

    let value = if neg { -value } else { value };
    if value < i32::MIN as i64 || value > i32::MAX as i64 {
        return Err(ErrorKind::BadOp);
    }
    Ok(value as i32)
}

/// Decode a key operator character into an articulation index.
fn key_value(key: u8) -> std::result::Result<u16, ErrorKind> {
    match key {
        b'0'..=b'9' => Ok((key - b'0') as u16),
        b'A'..=b'Z' => Ok((key - b'A') as u16 + 10),
        b'a'..=b'z' => Ok((key - b'a') as u16 + 36),
        _ => Err(ErrorKind::BadOp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pitch_bases() {
        assert_eq!(decode_pitch("c"), Ok(0));
        assert_eq!(decode_pitch("C"), Ok(-12));
        assert_eq!(decode_pitch("b"), Ok(11));
        assert_eq!(decode_pitch("B"), Ok(-1));
    }

    #[test]
    fn test_decode_pitch_modifiers() {
        assert_eq!(decode_pitch("cs"), Ok(1));
        assert_eq!(decode_pitch("ch"), Ok(-1));
        assert_eq!(decode_pitch("cx"), Ok(2));
        assert_eq!(decode_pitch("ct"), Ok(-2));
        assert_eq!(decode_pitch("cn"), Ok(0));
        assert_eq!(decode_pitch("c'"), Ok(12));
        assert_eq!(decode_pitch("c,,"), Ok(-24));
        assert_eq!(decode_pitch("Gs''"), Ok(20));
    }

    #[test]
    fn test_decode_pitch_range() {
        assert_eq!(decode_pitch("c''''"), Ok(48));
        assert_eq!(decode_pitch("A,,,"), Ok(-39));
        assert_eq!(decode_pitch("cs''''"), Err(ErrorKind::PitchR));
        assert_eq!(decode_pitch("C,,,"), Err(ErrorKind::PitchR));
        assert_eq!(decode_pitch("c."), Err(ErrorKind::BadPitch));
    }

    #[test]
    fn test_decode_dur_table() {
        assert_eq!(decode_dur("0"), Ok(0));
        assert_eq!(decode_dur("1"), Ok(6));
        assert_eq!(decode_dur("5"), Ok(96));
        assert_eq!(decode_dur("7"), Ok(384));
        assert_eq!(decode_dur("8"), Ok(32));
        assert_eq!(decode_dur("9"), Ok(64));
    }

    #[test]
    fn test_decode_dur_suffixes() {
        assert_eq!(decode_dur("5'"), Ok(192));
        assert_eq!(decode_dur("5."), Ok(144));
        assert_eq!(decode_dur("5,"), Ok(48));
        assert_eq!(decode_dur("1,"), Ok(3));
        assert_eq!(decode_dur("0'"), Err(ErrorKind::BadDur));
    }

    #[test]
    fn test_parse_i32() {
        assert_eq!(parse_i32("0"), Ok(0));
        assert_eq!(parse_i32("+12"), Ok(12));
        assert_eq!(parse_i32("-12"), Ok(-12));
        assert_eq!(parse_i32("2147483647"), Ok(i32::MAX));
        assert_eq!(parse_i32("-2147483648"), Ok(i32::MIN));
        assert_eq!(parse_i32("2147483648"), Err(ErrorKind::BadOp));
        assert_eq!(parse_i32(""), Err(ErrorKind::BadOp));
        assert_eq!(parse_i32("-"), Err(ErrorKind::BadOp));
        assert_eq!(parse_i32("1x"), Err(ErrorKind::BadOp));
    }

    #[test]
    fn test_key_values() {
        assert_eq!(key_value(b'0'), Ok(0));
        assert_eq!(key_value(b'9'), Ok(9));
        assert_eq!(key_value(b'A'), Ok(10));
        assert_eq!(key_value(b'Z'), Ok(35));
        assert_eq!(key_value(b'a'), Ok(36));
        assert_eq!(key_value(b'z'), Ok(61));
        assert_eq!(key_value(b'-'), Err(ErrorKind::BadOp));
    }
}
