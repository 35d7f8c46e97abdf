//! CSV serialization of tabular results.
//!
//! Output rules:
//! - an empty result produces no output at all, not even a header;
//! - otherwise the header is the first row's column names, followed by one
//!   record per row in the same column order;
//! - every field, header included, is wrapped in double quotes and embedded
//!   quotes are doubled;
//! - `,` separates fields and every record ends with CRLF;
//! - values are rendered the same way regardless of locale.
//!
//! The text is UTF-8 without a byte-order mark.

use crate::models::{TabularResult, Value};
use crate::{ExportError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::SecondsFormat;
use std::borrow::Cow;
use std::io::Write;

/// Renders a value as CSV field text.
///
/// | Value | Text |
/// |-------|------|
/// | `Null` | empty |
/// | `Boolean` | `true` / `false` |
/// | `Float` | shortest round-trip form, `NaN`, `Infinity`, `-Infinity` |
/// | `Date` | `2024-01-31` |
/// | `Time` | `13:45:00`, fractional seconds only when present |
/// | `Timestamp` | `2024-01-31T13:45:00` |
/// | `TimestampTz` | `2024-01-31T13:45:00Z` (UTC) |
/// | `Binary` | standard base64 |
pub fn render_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::Text(text) | Value::Decimal(text) => Cow::Borrowed(text),
        Value::Integer(n) => Cow::Owned(n.to_string()),
        Value::Float(f) => Cow::Owned(render_float(*f)),
        Value::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Date(date) => Cow::Owned(date.format("%Y-%m-%d").to_string()),
        Value::Time(time) => Cow::Owned(time.format("%H:%M:%S%.f").to_string()),
        Value::Timestamp(ts) => Cow::Owned(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        Value::TimestampTz(ts) => Cow::Owned(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Binary(bytes) => Cow::Owned(BASE64.encode(bytes)),
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else {
        f.to_string()
    }
}

/// Writes a result as CSV into `sink`.
///
/// Nothing is written for an empty result. The sink is flushed before
/// returning.
///
/// # Errors
/// Returns [`ExportError::Serialization`] when the CSV writer rejects a
/// record and [`ExportError::Io`] when the sink fails.
pub fn write_csv<W: Write>(result: &TabularResult, sink: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::CRLF)
        .from_writer(sink);

    if !result.is_empty() {
        writer
            .write_record(result.column_names())
            .map_err(|e| ExportError::serialization("Failed to write CSV header", e))?;

        for (index, row) in result.rows().iter().enumerate() {
            let fields: Vec<Cow<'_, str>> = row.values().map(render_value).collect();
            writer
                .write_record(fields.iter().map(|field| field.as_bytes()))
                .map_err(|e| {
                    ExportError::serialization(format!("Failed to write CSV row {}", index), e)
                })?;
        }
    }

    writer
        .flush()
        .map_err(|e| ExportError::io("Failed to flush CSV output", e))
}

/// Serializes a result into a CSV string.
///
/// Returns the empty string for an empty result.
///
/// # Example
/// ```rust
/// use pgview2csv_core::{Row, TabularResult, serializer::to_csv_string};
///
/// let result = TabularResult::from_rows([
///     Row::new().with("id", 1_i64).with("name", "a"),
///     Row::new().with("id", 2_i64).with("name", "b,c"),
/// ])?;
///
/// assert_eq!(
///     to_csv_string(&result)?,
///     "\"id\",\"name\"\r\n\"1\",\"a\"\r\n\"2\",\"b,c\"\r\n"
/// );
/// # Ok::<(), pgview2csv_core::ExportError>(())
/// ```
///
/// # Errors
/// Same as [`write_csv`].
pub fn to_csv_string(result: &TabularResult) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(result, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        ExportError::io(
            "CSV output is not valid UTF-8",
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })
}
