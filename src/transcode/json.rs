//! JSON → plist direction of the transcoder.
//!
//! Mirrors the plist reader: a byte cursor walks the JSON text once and
//! emits plist syntax. Objects become `(:key value ...)` lists in original
//! key order, arrays become `[...]` vectors, numbers are copied verbatim.
//!
//! JSON string escapes are fully decoded (`\n`, `\uXXXX`, surrogate pairs)
//! and re-emitted with the plist rules, which only escape `"` and `\`;
//! decoded control characters are carried as raw bytes, which the framed
//! payload permits.
//!
//! Object keys are emitted verbatim as field labels. The backend's keys are
//! identifier-like (`@type`, `chat_id`); a key containing plist delimiter
//! bytes would not re-parse and is rejected.

use bytes::{BufMut, BytesMut};

use super::MAX_NESTING_DEPTH;
use crate::error::{BridgeError, Result};

/// Transcode one JSON value to plist text.
///
/// Fails with `MalformedJson` on grammar violations, `UnsupportedJsonType`
/// on `true`/`false`/`null`, and `NestingTooDeep` past the depth bound.
pub fn json_to_plist(input: &[u8]) -> Result<BytesMut> {
    let mut cur = Cursor { data: input, x: 0 };
    let mut out = BytesMut::with_capacity(input.len());

    cur.skip_whitespace();
    cur.read_value(&mut out, 0)?;
    cur.skip_whitespace();
    if cur.x < cur.data.len() {
        return Err(cur.fail("trailing garbage after value"));
    }
    Ok(out)
}

struct Cursor<'a> {
    data: &'a [u8],
    x: usize,
}

impl<'a> Cursor<'a> {
    fn fail(&self, reason: &'static str) -> BridgeError {
        BridgeError::MalformedJson { pos: self.x, reason }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.x).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.x += 1;
        }
    }

    fn expect(&mut self, b: u8, reason: &'static str) -> Result<()> {
        if self.peek() == Some(b) {
            self.x += 1;
            Ok(())
        } else {
            Err(self.fail(reason))
        }
    }

    fn read_value(&mut self, out: &mut BytesMut, depth: usize) -> Result<()> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(BridgeError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        match self.peek() {
            Some(b'"') => {
                out.put_u8(b'"');
                self.read_string_body(out, false)?;
                out.put_u8(b'"');
                Ok(())
            }
            Some(b'{') => self.read_object(out, depth),
            Some(b'[') => self.read_array(out, depth),
            Some(b't') => self.reject_literal(b"true", "true"),
            Some(b'f') => self.reject_literal(b"false", "false"),
            Some(b'n') => self.reject_literal(b"null", "null"),
            Some(c) if c == b'-' || c.is_ascii_digit() => self.read_number(out),
            Some(_) => Err(self.fail("unexpected byte at start of value")),
            None => Err(self.fail("unexpected end of input")),
        }
    }

    /// `true`/`false`/`null` parse fine but have no plist form.
    fn reject_literal(&mut self, word: &'static [u8], name: &'static str) -> Result<()> {
        if self.data[self.x..].starts_with(word) {
            self.x += word.len();
            Err(BridgeError::UnsupportedJsonType(name))
        } else {
            Err(self.fail("unexpected byte at start of value"))
        }
    }

    /// JSON string body (after the opening quote) decoded and re-emitted
    /// with plist escaping. With `as_label` the decoded bytes go out bare
    /// and delimiter bytes are rejected instead of escaped.
    fn read_string_body(&mut self, out: &mut BytesMut, as_label: bool) -> Result<()> {
        self.expect(b'"', "expected string")?;
        let mut len = 0usize;
        loop {
            let b = self.peek().ok_or_else(|| self.fail("unterminated string"))?;
            self.x += 1;
            match b {
                b'"' => {
                    if as_label && len == 0 {
                        return Err(self.fail("empty object key"));
                    }
                    return Ok(());
                }
                b'\\' => {
                    let esc = self.peek().ok_or_else(|| self.fail("unterminated string"))?;
                    self.x += 1;
                    let decoded: char = match esc {
                        b'"' => '"',
                        b'\\' => '\\',
                        b'/' => '/',
                        b'b' => '\u{08}',
                        b'f' => '\u{0c}',
                        b'n' => '\n',
                        b'r' => '\r',
                        b't' => '\t',
                        b'u' => self.read_unicode_escape()?,
                        _ => return Err(self.fail("unknown escape")),
                    };
                    self.put_decoded_char(out, decoded, as_label)?;
                }
                c => {
                    if as_label && is_label_delimiter(c) {
                        return Err(self.fail("object key not representable as plist field"));
                    }
                    out.put_u8(c);
                }
            }
            len += 1;
        }
    }

    /// `\uXXXX`, combining surrogate pairs into one scalar value.
    fn read_unicode_escape(&mut self) -> Result<char> {
        let unit = self.read_hex4()?;
        match unit {
            0xD800..=0xDBFF => {
                self.expect(b'\\', "unpaired surrogate")?;
                self.expect(b'u', "unpaired surrogate")?;
                let low = self.read_hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(self.fail("unpaired surrogate"));
                }
                let c = 0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
                char::from_u32(c).ok_or_else(|| self.fail("invalid unicode escape"))
            }
            0xDC00..=0xDFFF => Err(self.fail("unpaired surrogate")),
            _ => char::from_u32(u32::from(unit)).ok_or_else(|| self.fail("invalid unicode escape")),
        }
    }

    fn read_hex4(&mut self) -> Result<u16> {
        let mut v: u16 = 0;
        for _ in 0..4 {
            let b = self.peek().ok_or_else(|| self.fail("truncated unicode escape"))?;
            let digit = match b {
                b'0'..=b'9' => b - b'0',
                b'a'..=b'f' => b - b'a' + 10,
                b'A'..=b'F' => b - b'A' + 10,
                _ => return Err(self.fail("bad hex digit in unicode escape")),
            };
            self.x += 1;
            v = (v << 4) | u16::from(digit);
        }
        Ok(v)
    }

    fn put_decoded_char(&self, out: &mut BytesMut, c: char, as_label: bool) -> Result<()> {
        let mut utf8 = [0u8; 4];
        for &b in c.encode_utf8(&mut utf8).as_bytes() {
            match b {
                b'"' | b'\\' if !as_label => {
                    out.put_u8(b'\\');
                    out.put_u8(b);
                }
                _ if as_label && is_label_delimiter(b) => {
                    return Err(self.fail("object key not representable as plist field"));
                }
                _ => out.put_u8(b),
            }
        }
        Ok(())
    }

    /// Number copied verbatim. JSON numeric grammar is already plist
    /// compatible, only the shape is validated.
    fn read_number(&mut self, out: &mut BytesMut) -> Result<()> {
        let start = self.x;
        if self.peek() == Some(b'-') {
            self.x += 1;
        }
        if self.skip_digits() == 0 {
            return Err(self.fail("number with no digits"));
        }
        if self.peek() == Some(b'.') {
            self.x += 1;
            if self.skip_digits() == 0 {
                return Err(self.fail("number with no digits after decimal point"));
            }
        }
        if let Some(b'e' | b'E') = self.peek() {
            self.x += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.x += 1;
            }
            if self.skip_digits() == 0 {
                return Err(self.fail("number with no digits in exponent"));
            }
        }
        out.put_slice(&self.data[start..self.x]);
        Ok(())
    }

    fn skip_digits(&mut self) -> usize {
        let start = self.x;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.x += 1;
        }
        self.x - start
    }

    fn read_object(&mut self, out: &mut BytesMut, depth: usize) -> Result<()> {
        self.x += 1; // '{'
        out.put_u8(b'(');
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.x += 1;
            out.put_u8(b')');
            return Ok(());
        }
        loop {
            self.skip_whitespace();
            out.put_u8(b':');
            self.read_string_body(out, true)?;
            self.skip_whitespace();
            self.expect(b':', "expected colon after object key")?;
            self.skip_whitespace();
            out.put_u8(b' ');
            self.read_value(out, depth + 1)?;
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.x += 1;
                    out.put_u8(b' ');
                }
                Some(b'}') => {
                    self.x += 1;
                    out.put_u8(b')');
                    return Ok(());
                }
                _ => return Err(self.fail("expected comma or closing brace")),
            }
        }
    }

    fn read_array(&mut self, out: &mut BytesMut, depth: usize) -> Result<()> {
        self.x += 1; // '['
        out.put_u8(b'[');
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.x += 1;
            out.put_u8(b']');
            return Ok(());
        }
        loop {
            self.skip_whitespace();
            self.read_value(out, depth + 1)?;
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.x += 1;
                    out.put_u8(b' ');
                }
                Some(b']') => {
                    self.x += 1;
                    out.put_u8(b']');
                    return Ok(());
                }
                _ => return Err(self.fail("expected comma or closing bracket")),
            }
        }
    }
}

/// Bytes that would terminate or corrupt a bare field label.
fn is_label_delimiter(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'\t' | b'\n' | b'\r' | b'(' | b')' | b'[' | b']' | b'"' | b':' | b'\\'
    )
}
