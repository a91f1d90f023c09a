//! Plist → JSON direction of the transcoder.
//!
//! Byte-cursor recursive descent over the structured-literal grammar:
//!
//! ```text
//! value  := string | number | list | vector
//! string := '"' (escaped | byte)* '"'       escapes: \" and \\ only
//! vector := '[' value* ']'                  -> JSON array
//! list   := '(' (field value)* ')'          -> JSON object
//! field  := ':' label                       label keeps any '@', drops ':'
//! ```
//!
//! Strings are re-escaped on the way out: plist strings may carry raw
//! control bytes, which JSON requires as `\n`, `\t`, `\u00XX` and friends.
//! Numbers are copied verbatim once they match JSON numeric grammar (a
//! leading `+` is dropped, JSON has no positive sign).

use bytes::{BufMut, BytesMut};

use super::MAX_NESTING_DEPTH;
use crate::error::{BridgeError, Result};

/// Transcode one plist value to JSON text.
///
/// Fails with `MalformedLiteral` on unterminated strings, unbalanced
/// delimiters, a list value with no preceding field, or trailing garbage
/// after the top-level value; with `NestingTooDeep` past the depth bound.
pub fn plist_to_json(input: &[u8]) -> Result<BytesMut> {
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
        BridgeError::MalformedLiteral { pos: self.x, reason }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.x).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.x += 1;
        }
    }

    fn read_value(&mut self, out: &mut BytesMut, depth: usize) -> Result<()> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(BridgeError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        match self.peek() {
            Some(b'"') => self.read_string(out),
            Some(b'(') => self.read_list(out, depth),
            Some(b'[') => self.read_vector(out, depth),
            Some(c) if c == b'-' || c == b'+' || c.is_ascii_digit() => self.read_number(out),
            Some(_) => Err(self.fail("unexpected byte at start of value")),
            None => Err(self.fail("unexpected end of input")),
        }
    }

    /// Plist string body to JSON string body, translating escapes.
    fn read_string(&mut self, out: &mut BytesMut) -> Result<()> {
        self.x += 1; // opening quote
        out.put_u8(b'"');
        loop {
            let b = self.peek().ok_or_else(|| self.fail("unterminated string"))?;
            self.x += 1;
            match b {
                b'"' => {
                    out.put_u8(b'"');
                    return Ok(());
                }
                b'\\' => {
                    let esc = self.peek().ok_or_else(|| self.fail("unterminated string"))?;
                    self.x += 1;
                    match esc {
                        b'"' => out.put_slice(b"\\\""),
                        b'\\' => out.put_slice(b"\\\\"),
                        _ => return Err(self.fail("unsupported escape in string")),
                    }
                }
                _ => put_json_escaped(out, b),
            }
        }
    }

    /// Number copied verbatim, minus any leading `+`.
    fn read_number(&mut self, out: &mut BytesMut) -> Result<()> {
        match self.peek() {
            Some(b'+') => self.x += 1,
            Some(b'-') => {
                out.put_u8(b'-');
                self.x += 1;
            }
            _ => {}
        }

        let digits = self.copy_digits(out);
        if digits == 0 {
            return Err(self.fail("number with no digits"));
        }
        if self.peek() == Some(b'.') {
            out.put_u8(b'.');
            self.x += 1;
            if self.copy_digits(out) == 0 {
                return Err(self.fail("number with no digits after decimal point"));
            }
        }
        if let Some(b'e' | b'E') = self.peek() {
            out.put_u8(self.data[self.x]);
            self.x += 1;
            if let Some(s @ (b'+' | b'-')) = self.peek() {
                out.put_u8(s);
                self.x += 1;
            }
            if self.copy_digits(out) == 0 {
                return Err(self.fail("number with no digits in exponent"));
            }
        }
        Ok(())
    }

    fn copy_digits(&mut self, out: &mut BytesMut) -> usize {
        let start = self.x;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.x += 1;
        }
        out.put_slice(&self.data[start..self.x]);
        self.x - start
    }

    fn read_vector(&mut self, out: &mut BytesMut, depth: usize) -> Result<()> {
        self.x += 1; // '['
        out.put_u8(b'[');
        let mut first = true;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b']') => {
                    self.x += 1;
                    out.put_u8(b']');
                    return Ok(());
                }
                Some(_) => {
                    if !first {
                        out.put_u8(b',');
                    }
                    first = false;
                    self.read_value(out, depth + 1)?;
                }
                None => return Err(self.fail("unbalanced bracket")),
            }
        }
    }

    fn read_list(&mut self, out: &mut BytesMut, depth: usize) -> Result<()> {
        self.x += 1; // '('
        out.put_u8(b'{');
        let mut first = true;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b')') => {
                    self.x += 1;
                    out.put_u8(b'}');
                    return Ok(());
                }
                Some(b':') => {
                    if !first {
                        out.put_u8(b',');
                    }
                    first = false;
                    self.x += 1;
                    self.read_field_label(out)?;
                    out.put_u8(b':');
                    self.skip_whitespace();
                    if matches!(self.peek(), Some(b')') | None) {
                        return Err(self.fail("field without value"));
                    }
                    self.read_value(out, depth + 1)?;
                }
                Some(_) => return Err(self.fail("value not preceded by a field")),
                None => return Err(self.fail("unbalanced paren")),
            }
        }
    }

    /// Label after `:`, up to whitespace or a delimiter. Keeps the `@`.
    fn read_field_label(&mut self, out: &mut BytesMut) -> Result<()> {
        let start = self.x;
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | b'(' | b')' | b'[' | b']' | b'"' | b':' => break,
                _ => self.x += 1,
            }
        }
        if self.x == start {
            return Err(self.fail("empty field label"));
        }
        out.put_u8(b'"');
        for &b in &self.data[start..self.x] {
            put_json_escaped(out, b);
        }
        out.put_u8(b'"');
        Ok(())
    }
}

/// Append one raw byte to a JSON string body, escaping as JSON requires.
fn put_json_escaped(out: &mut BytesMut, b: u8) {
    match b {
        b'"' => out.put_slice(b"\\\""),
        b'\\' => out.put_slice(b"\\\\"),
        0x08 => out.put_slice(b"\\b"),
        0x09 => out.put_slice(b"\\t"),
        0x0a => out.put_slice(b"\\n"),
        0x0c => out.put_slice(b"\\f"),
        0x0d => out.put_slice(b"\\r"),
        c if c < 0x20 => {
            out.put_slice(format!("\\u{:04x}", c).as_bytes());
        }
        c => out.put_u8(c),
    }
}
