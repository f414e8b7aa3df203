//! JSON text with every non-ASCII character escaped as `\uXXXX`.
//!
//! Tool results handed to the model use this form: compact output with
//! `", "` / `": "` separators, or pretty output with a 2-space indent.

use serde::ser::Error as _;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use std::io;

/// Formatter that escapes everything outside printable ASCII and
/// optionally indents.
struct AsciiFormatter<'a> {
    indent: Option<&'a [u8]>,
    level: usize,
    has_value: bool,
}

impl<'a> AsciiFormatter<'a> {
    fn new(indent: Option<&'a [u8]>) -> Self {
        Self {
            indent,
            level: 0,
            has_value: false,
        }
    }

    fn item_separator(&self) -> &'static [u8] {
        if self.indent.is_some() {
            b","
        } else {
            b", "
        }
    }

    fn newline<W: ?Sized + io::Write>(&self, w: &mut W) -> io::Result<()> {
        if let Some(indent) = self.indent {
            w.write_all(b"\n")?;
            for _ in 0..self.level {
                w.write_all(indent)?;
            }
        }
        Ok(())
    }
}

impl Formatter for AsciiFormatter<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.level += 1;
        self.has_value = false;
        w.write_all(b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.level -= 1;
        if self.has_value {
            self.newline(w)?;
        }
        w.write_all(b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, w: &mut W, first: bool) -> io::Result<()> {
        if !first {
            w.write_all(self.item_separator())?;
        }
        self.newline(w)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _w: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.level += 1;
        self.has_value = false;
        w.write_all(b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.level -= 1;
        if self.has_value {
            self.newline(w)?;
        }
        w.write_all(b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, w: &mut W, first: bool) -> io::Result<()> {
        if !first {
            w.write_all(self.item_separator())?;
        }
        self.newline(w)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_all(b": ")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _w: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    // Quotes, backslashes and control characters are escaped by the
    // serializer before fragments reach this point.
    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, w: &mut W, fragment: &str) -> io::Result<()> {
        let bytes = fragment.as_bytes();
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            w.write_all(&bytes[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(w, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        w.write_all(&bytes[start..])
    }
}

fn render(value: &Value, formatter: AsciiFormatter<'_>) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(serde_json::Error::custom)
}

/// Single line, `", "` and `": "` separators.
pub fn to_string(value: &Value) -> serde_json::Result<String> {
    render(value, AsciiFormatter::new(None))
}

/// Two-space indent, one member per line.
pub fn to_string_pretty(value: &Value) -> serde_json::Result<String> {
    render(value, AsciiFormatter::new(Some(b"  ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compact_uses_spaced_separators() {
        let v = json!({"users": [{"id": 1, "firstName": "Ana"}], "count": 1});
        assert_eq!(
            to_string(&v).unwrap(),
            r#"{"users": [{"id": 1, "firstName": "Ana"}], "count": 1}"#
        );
        assert_eq!(to_string(&json!([])).unwrap(), "[]");
        assert_eq!(to_string(&json!({})).unwrap(), "{}");
    }

    #[test]
    fn non_ascii_is_escaped() {
        assert_eq!(to_string(&json!({"name": "Zoë"})).unwrap(), r#"{"name": "Zo\u00eb"}"#);
        // Astral characters become surrogate pairs.
        assert_eq!(to_string(&json!("🚀")).unwrap(), r#""\ud83d\ude80""#);
        assert_eq!(to_string(&json!("a\u{7f}\n\"")).unwrap(), r#""a\u007f\n\"""#);
    }

    #[test]
    fn pretty_matches_two_space_layout() {
        let v = json!({"a": [1, {"b": "é"}], "c": {}, "d": []});
        let expected = "{\n  \"a\": [\n    1,\n    {\n      \"b\": \"\\u00e9\"\n    }\n  ],\n  \"c\": {},\n  \"d\": []\n}";
        assert_eq!(to_string_pretty(&v).unwrap(), expected);
    }
}
