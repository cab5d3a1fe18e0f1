//! Incremental extraction of result rows from a `FORMAT JSON` document.
//!
//! ClickHouse answers with an object such as
//! `{"meta":[...],"data":[{...},{...}],"rows":2,"statistics":{...}}`.
//! [`RowScanner`] is fed the body chunk by chunk and hands back the raw
//! bytes of each element of the `data` array as soon as that element is
//! complete, so at most one row is buffered at a time.

use serde::de::DeserializeOwned;

use crate::{ClickHouseError, Result};

/// Top-level field holding the result rows.
pub const ROWS_FIELD: &str = "data";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// Outside the rows array.
    Document,
    /// Inside the rows array, between elements.
    Rows,
    /// Inside one row element.
    Row,
    /// The top-level object has been closed.
    Finished,
}

#[derive(Debug)]
pub struct RowScanner {
    field: &'static [u8],
    state: State,
    /// Nesting depth of the document outside the rows array.
    depth: usize,
    /// Nesting depth inside the current row.
    row_depth: usize,
    in_string: bool,
    escaped: bool,
    expect_key: bool,
    capturing_key: bool,
    key: Vec<u8>,
    /// The value following the current key is the rows array.
    rows_value: bool,
    rows_seen: bool,
    row: Vec<u8>,
    /// The value following the current key is the server's exception text.
    exception_value: bool,
    capturing_exception: bool,
    exception: Option<Vec<u8>>,
}

impl Default for RowScanner {
    fn default() -> Self {
        Self::new(ROWS_FIELD)
    }
}

impl RowScanner {
    pub fn new(field: &'static str) -> Self {
        Self {
            field: field.as_bytes(),
            state: State::Document,
            depth: 0,
            row_depth: 0,
            in_string: false,
            escaped: false,
            expect_key: false,
            capturing_key: false,
            key: Vec::new(),
            rows_value: false,
            rows_seen: false,
            row: Vec::new(),
            exception_value: false,
            capturing_exception: false,
            exception: None,
        }
    }

    /// Consumes one body chunk, appending every row it completes to `rows`.
    ///
    /// Rows completed before a structure error are still appended.
    pub fn feed(&mut self, chunk: &[u8], rows: &mut Vec<Vec<u8>>) -> Result<()> {
        for &byte in chunk {
            if let Some(row) = self.push(byte)? {
                rows.push(row);
            }
        }
        Ok(())
    }

    /// Checks that the body ended on a complete document with a rows array
    /// and without a top-level `exception`.
    pub fn finish(&self) -> Result<()> {
        if let Some(exception) = &self.exception {
            return Err(ClickHouseError::Decode(format!(
                "server reported an exception: {}",
                unescape(exception)
            )));
        }
        if self.state != State::Finished {
            return Err(ClickHouseError::Decode(
                "response body ended before the JSON document was complete".to_owned(),
            ));
        }
        if !self.rows_seen {
            return Err(ClickHouseError::Decode(format!(
                "response has no `{}` array",
                String::from_utf8_lossy(self.field)
            )));
        }
        Ok(())
    }

    fn push(&mut self, byte: u8) -> Result<Option<Vec<u8>>> {
        if self.in_string {
            self.push_string_byte(byte);
            return Ok(None);
        }

        match self.state {
            State::Document => self.push_document_byte(byte).map(|()| None),
            State::Rows => match byte {
                b',' => Ok(None),
                b']' => {
                    self.close_rows();
                    Ok(None)
                }
                _ if byte.is_ascii_whitespace() => Ok(None),
                _ => {
                    self.state = State::Row;
                    self.row.clear();
                    self.row_depth = 0;
                    self.push_row_byte(byte)
                }
            },
            State::Row => self.push_row_byte(byte),
            State::Finished if byte.is_ascii_whitespace() => Ok(None),
            State::Finished => Err(unexpected(byte, "after the end of the document")),
        }
    }

    fn push_string_byte(&mut self, byte: u8) {
        if self.state == State::Row {
            self.row.push(byte);
        }

        if self.escaped {
            self.escaped = false;
        } else if byte == b'\\' {
            self.escaped = true;
        } else if byte == b'"' {
            self.in_string = false;
            self.capturing_key = false;
            self.capturing_exception = false;
            return;
        }

        if self.capturing_key {
            self.key.push(byte);
        }
        if self.capturing_exception {
            if let Some(exception) = &mut self.exception {
                exception.push(byte);
            }
        }
    }

    fn push_document_byte(&mut self, byte: u8) -> Result<()> {
        if byte.is_ascii_whitespace() {
            return Ok(());
        }

        if self.depth == 0 {
            if byte != b'{' {
                return Err(unexpected(byte, "where a JSON object was expected"));
            }
            self.depth = 1;
            self.expect_key = true;
            return Ok(());
        }

        if self.depth == 1 {
            match byte {
                b'"' if self.expect_key => {
                    self.in_string = true;
                    self.expect_key = false;
                    self.capturing_key = true;
                    self.key.clear();
                    return Ok(());
                }
                b':' => {
                    self.rows_value = self.key == self.field;
                    self.exception_value = self.key == b"exception";
                    return Ok(());
                }
                b',' => {
                    self.expect_key = true;
                    return Ok(());
                }
                b'"' if self.exception_value => {
                    self.exception_value = false;
                    self.in_string = true;
                    self.capturing_exception = true;
                    self.exception = Some(Vec::new());
                    return Ok(());
                }
                b'[' if self.rows_value => {
                    self.rows_value = false;
                    self.rows_seen = true;
                    self.state = State::Rows;
                    return Ok(());
                }
                b'}' => {
                    self.depth = 0;
                    self.state = State::Finished;
                    return Ok(());
                }
                _ => {
                    self.rows_value = false;
                    self.exception_value = false;
                }
            }
        }

        match byte {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => self.depth -= 1,
            _ => {}
        }
        Ok(())
    }

    fn push_row_byte(&mut self, byte: u8) -> Result<Option<Vec<u8>>> {
        match byte {
            b'"' => {
                self.in_string = true;
                self.row.push(byte);
            }
            b'{' | b'[' => {
                self.row_depth += 1;
                self.row.push(byte);
            }
            b'}' | b']' if self.row_depth > 0 => {
                self.row_depth -= 1;
                self.row.push(byte);
                if self.row_depth == 0 {
                    self.state = State::Rows;
                    return Ok(Some(self.take_row()));
                }
            }
            // A scalar element ends at the separator or the end of the array.
            b',' if self.row_depth == 0 => {
                self.state = State::Rows;
                return Ok(Some(self.take_row()));
            }
            b']' => {
                self.close_rows();
                return Ok(Some(self.take_row()));
            }
            b'}' => return Err(unexpected(byte, "inside the rows array")),
            _ => self.row.push(byte),
        }
        Ok(None)
    }

    fn close_rows(&mut self) {
        self.state = State::Document;
    }

    fn take_row(&mut self) -> Vec<u8> {
        let mut row = std::mem::take(&mut self.row);
        while row.last().is_some_and(u8::is_ascii_whitespace) {
            row.pop();
        }
        row
    }
}

/// Deserializes one row emitted by [`RowScanner`].
pub fn decode_row<T: DeserializeOwned>(row: &[u8]) -> Result<T> {
    serde_json::from_slice(row).map_err(|err| {
        ClickHouseError::Decode(format!(
            "invalid row: {err}; row: {}",
            String::from_utf8_lossy(row)
        ))
    })
}

/// Resolves JSON escapes in raw string contents, falling back to the raw text.
fn unescape(raw: &[u8]) -> String {
    let mut quoted = Vec::with_capacity(raw.len() + 2);
    quoted.push(b'"');
    quoted.extend_from_slice(raw);
    quoted.push(b'"');
    serde_json::from_slice::<String>(&quoted)
        .unwrap_or_else(|_| String::from_utf8_lossy(raw).into_owned())
        .trim()
        .to_owned()
}

fn unexpected(byte: u8, context: &str) -> ClickHouseError {
    ClickHouseError::Decode(format!(
        "unexpected character {:?} {context}",
        char::from(byte)
    ))
}
