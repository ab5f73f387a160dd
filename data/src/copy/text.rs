//! Text-format COPY rows.
//!
//! Columns are separated by a tab and rows end with a newline. NULL is `\N`;
//! backslash, tab, newline and carriage return inside a value are escaped.

use crate::error::{DataError, Result};

/// NULL marker in text COPY data.
pub const NULL_MARKER: &str = "\\N";

/// Encodes rows as text COPY data.
#[derive(Debug, Clone, Default)]
pub struct TextCopyWriter {
    buffer: String,
    columns: Option<usize>,
    rows: u64,
}

impl TextCopyWriter {
    /// Empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row. `None` fields are written as NULL.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Copy`] for an empty row or a field count that
    /// differs from the first row.
    pub fn write_row<S: AsRef<str>>(&mut self, values: &[Option<S>]) -> Result<()> {
        if values.is_empty() {
            return Err(DataError::Copy("row has no fields".to_string()));
        }
        match self.columns {
            Some(columns) if columns != values.len() => {
                return Err(DataError::Copy(format!(
                    "row has {} fields, expected {columns}",
                    values.len()
                )));
            },
            _ => {},
        }

        for (index, value) in values.iter().enumerate() {
            if index > 0 {
                self.buffer.push('\t');
            }
            match value {
                Some(value) => escape_into(&mut self.buffer, value.as_ref()),
                None => self.buffer.push_str(NULL_MARKER),
            }
        }
        self.buffer.push('\n');

        self.columns = Some(values.len());
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far.
    #[must_use]
    pub const fn rows(&self) -> u64 {
        self.rows
    }

    /// Drain the buffered text.
    pub fn take_chunk(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    /// The buffered text.
    #[must_use]
    pub fn finish(self) -> String {
        self.buffer
    }
}

fn escape_into(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
}

/// Parse one text COPY row. A trailing newline is ignored.
///
/// Besides the escapes [`TextCopyWriter`] produces this accepts `\b`, `\f`,
/// `\v`, octal `\ooo` and hex `\xhh`; any other escaped character stands
/// for itself.
///
/// # Errors
///
/// Returns [`DataError::Copy`] for a dangling backslash or an escape that
/// does not form valid UTF-8.
pub fn parse_text_row(line: &str) -> Result<Vec<Option<String>>> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    line.split('\t')
        .map(|field| {
            if field == NULL_MARKER {
                Ok(None)
            } else {
                unescape(field).map(Some)
            }
        })
        .collect()
}

fn unescape(field: &str) -> Result<String> {
    if !field.contains('\\') {
        return Ok(field.to_string());
    }

    let mut bytes = Vec::with_capacity(field.len());
    let mut chars = field.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0_u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let escaped = chars
            .next()
            .ok_or_else(|| DataError::Copy(format!("dangling backslash in '{field}'")))?;
        match escaped {
            'b' => bytes.push(0x08),
            'f' => bytes.push(0x0C),
            'n' => bytes.push(b'\n'),
            'r' => bytes.push(b'\r'),
            't' => bytes.push(b'\t'),
            'v' => bytes.push(0x0B),
            '0'..='7' => {
                let mut value = u32::from(escaped) - u32::from('0');
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        },
                        None => break,
                    }
                }
                bytes.push(u8::try_from(value & 0xFF).unwrap_or_default());
            },
            'x' if chars.peek().is_some_and(char::is_ascii_hexdigit) => {
                let mut value = 0;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            chars.next();
                        },
                        None => break,
                    }
                }
                bytes.push(u8::try_from(value).unwrap_or_default());
            },
            other => {
                let mut buf = [0_u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            },
        }
    }

    String::from_utf8(bytes).map_err(|e| DataError::Copy(format!("invalid UTF-8 in text field: {e}")))
}
