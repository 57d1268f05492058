//! The `/_stats` record and its CSV parsing.
//!
//! The remote host answers with a single CSV line of six numeric fields:
//! load average, total memory, used memory, total disk, used disk and
//! network bandwidth. Only the first record of the body is read.

use std::num::IntErrorKind;

use crate::error::StatsParseError;

/// Number of fields in a well-formed record.
pub const FIELD_COUNT: usize = 6;

/// Field names in record order, used in parse errors.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "load_average",
    "total_memory",
    "used_memory",
    "total_disk",
    "used_disk",
    "network_bandwidth",
];

/// How numeric fields that fail to parse are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldParsing {
    /// Treat an unparseable field as zero and keep going.
    ///
    /// Bad data can then pass every threshold check silently. Integers
    /// that are well-formed but out of range clamp to `i64::MAX`/`i64::MIN`.
    #[default]
    Lenient,
    /// Reject the record with [`StatsParseError::InvalidField`].
    Strict,
}

/// One sample of remote resource usage. Memory and disk values are bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSample {
    pub load_average: f64,
    pub total_memory: i64,
    pub used_memory: i64,
    pub total_disk: i64,
    pub used_disk: i64,
    /// Compared against `used_memory` by the network check.
    pub network_bandwidth: i64,
}

impl StatsSample {
    /// Parse the first CSV record of a response body.
    pub fn parse(body: &str, mode: FieldParsing) -> Result<Self, StatsParseError> {
        let fields = split_record(body)?;
        Self::from_fields(&fields, mode)
    }

    /// Build a sample from already-split fields.
    ///
    /// Exactly [`FIELD_COUNT`] fields are required regardless of `mode`.
    pub fn from_fields<S: AsRef<str>>(
        fields: &[S],
        mode: FieldParsing,
    ) -> Result<Self, StatsParseError> {
        if fields.len() != FIELD_COUNT {
            return Err(StatsParseError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            });
        }

        let int = |index: usize| parse_int(fields[index].as_ref(), index, mode);

        Ok(Self {
            load_average: parse_float(fields[0].as_ref(), 0, mode)?,
            total_memory: int(1)?,
            used_memory: int(2)?,
            total_disk: int(3)?,
            used_disk: int(4)?,
            network_bandwidth: int(5)?,
        })
    }
}

fn parse_float(value: &str, index: usize, mode: FieldParsing) -> Result<f64, StatsParseError> {
    match value.parse::<f64>() {
        Ok(v) => Ok(v),
        Err(_) if mode == FieldParsing::Lenient => Ok(0.0),
        Err(_) => Err(invalid_field(value, index)),
    }
}

fn parse_int(value: &str, index: usize, mode: FieldParsing) -> Result<i64, StatsParseError> {
    match value.parse::<i64>() {
        Ok(v) => Ok(v),
        Err(e) if mode == FieldParsing::Lenient => Ok(match e.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => 0,
        }),
        Err(_) => Err(invalid_field(value, index)),
    }
}

fn invalid_field(value: &str, index: usize) -> StatsParseError {
    StatsParseError::InvalidField {
        index,
        field: FIELD_NAMES[index],
        value: value.to_string(),
    }
}

/// Split the first CSV record out of `body`.
///
/// Fields are separated by commas and may be double-quoted, with `""`
/// standing for a literal quote. Leading blank lines are skipped and
/// anything after the first record terminator is ignored. Whitespace is
/// kept as-is.
pub fn split_record(body: &str) -> Result<Vec<String>, StatsParseError> {
    let body = body.trim_start_matches(['\r', '\n']);
    if body.is_empty() {
        return Err(StatsParseError::Empty);
    }

    let mut fields = Vec::with_capacity(FIELD_COUNT);
    let mut field = String::new();
    let mut in_quotes = false;
    let mut after_quote = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                    after_quote = true;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            ',' => {
                fields.push(std::mem::take(&mut field));
                after_quote = false;
            }
            '\n' => {
                fields.push(field);
                return Ok(fields);
            }
            '\r' if matches!(chars.peek(), Some('\n') | None) => {
                fields.push(field);
                return Ok(fields);
            }
            _ if after_quote => {
                return Err(StatsParseError::Malformed(format!(
                    "unexpected {c:?} after closing quote in field {}",
                    fields.len()
                )));
            }
            '"' if field.is_empty() => in_quotes = true,
            '"' => {
                return Err(StatsParseError::Malformed(format!(
                    "bare quote in unquoted field {}",
                    fields.len()
                )));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(StatsParseError::Malformed(format!(
            "unterminated quoted field {}",
            fields.len()
        )));
    }

    fields.push(field);
    Ok(fields)
}
