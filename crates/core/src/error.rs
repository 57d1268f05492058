/// Errors produced while turning a `/_stats` response body into a
/// [`StatsSample`](crate::stats::StatsSample).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsParseError {
    #[error("Response body contains no CSV record")]
    Empty,

    #[error("Malformed CSV record: {0}")]
    Malformed(String),

    #[error("Unexpected data length: expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("Field {index} ({field}) is not a valid number: {value:?}")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },
}
