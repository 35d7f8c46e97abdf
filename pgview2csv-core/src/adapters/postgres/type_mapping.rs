//! PostgreSQL row decoding into [`Value`]s.
//!
//! Columns are decoded by their PostgreSQL type name. Types without a
//! dedicated mapping (arrays, intervals, network addresses, money, enums,
//! ...) are exported as the server's own text rendering, which is what the
//! simple-query protocol delivers for every column. A text value that a
//! typed decoder rejects (`infinity` timestamps, for instance) is kept as
//! that text too.
//!
//! Binary values only reach the decoder through the extended protocol. For
//! those, an unmapped type is an error rather than raw wire bytes in the
//! CSV.

use crate::models::{Row, Value};
use crate::{ExportError, Result};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgRow, PgValueFormat};
use sqlx::types::BigDecimal;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

/// Converts a driver row into a [`Row`], keeping column order.
pub(crate) fn decode_row(row: &PgRow, sql: &str) -> Result<Row> {
    let mut decoded = Row::with_capacity(row.columns().len());

    for column in row.columns() {
        let type_name = column.type_info().name();
        let value = decode_column(row, column.ordinal(), type_name).map_err(|e| {
            ExportError::query_failed(
                format!(
                    "Failed to decode column '{}' of type {}",
                    column.name(),
                    type_name
                ),
                sql,
                e,
            )
        })?;
        decoded.push(column.name(), value);
    }

    Ok(decoded)
}

fn decode_column(
    row: &PgRow,
    index: usize,
    type_name: &str,
) -> std::result::Result<Value, sqlx::Error> {
    let format = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.format()
    };

    match (format, decode_typed(row, index, type_name, format)) {
        (_, Ok(Some(value))) => Ok(value),
        (PgValueFormat::Text, Ok(None)) => Ok(Value::Text(read_text(row, index)?)),
        (PgValueFormat::Text, Err(e)) => {
            tracing::debug!(
                "Keeping {} value of column {} as text: {}",
                type_name,
                index,
                e
            );
            Ok(Value::Text(read_text(row, index)?))
        }
        (PgValueFormat::Binary, Ok(None)) => Err(sqlx::Error::Decode(
            format!("no text rendering for binary {} values", type_name).into(),
        )),
        (PgValueFormat::Binary, Err(e)) => Err(e),
    }
}

fn read_text(row: &PgRow, index: usize) -> std::result::Result<String, sqlx::Error> {
    row.try_get_unchecked::<String, _>(index)
}

/// Decodes a non-null value of a mapped type; `Ok(None)` for unmapped types.
fn decode_typed(
    row: &PgRow,
    index: usize,
    type_name: &str,
    format: PgValueFormat,
) -> std::result::Result<Option<Value>, sqlx::Error> {
    let value = match type_name {
        "BOOL" => Value::Boolean(row.try_get::<bool, _>(index)?),
        "INT2" => Value::Integer(i64::from(row.try_get::<i16, _>(index)?)),
        "INT4" => Value::Integer(i64::from(row.try_get::<i32, _>(index)?)),
        "INT8" => Value::Integer(row.try_get::<i64, _>(index)?),
        "OID" => Value::Integer(i64::from(row.try_get::<Oid, _>(index)?.0)),
        "FLOAT4" => Value::Float(widen_f32(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => Value::Float(row.try_get::<f64, _>(index)?),
        "NUMERIC" => Value::Decimal(match format {
            // The server's text is already the exact rendering, NaN included
            PgValueFormat::Text => read_text(row, index)?,
            PgValueFormat::Binary => {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                match numeric_special_value(&bytes) {
                    Some(special) => special.to_string(),
                    None => row.try_get::<BigDecimal, _>(index)?.to_string(),
                }
            }
        }),
        "UUID" => Value::Text(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
        "JSON" | "JSONB" => Value::Text(row.try_get::<serde_json::Value, _>(index)?.to_string()),
        "DATE" => Value::Date(row.try_get::<chrono::NaiveDate, _>(index)?),
        "TIME" => Value::Time(row.try_get::<chrono::NaiveTime, _>(index)?),
        "TIMESTAMP" => Value::Timestamp(row.try_get::<chrono::NaiveDateTime, _>(index)?),
        "TIMESTAMPTZ" => {
            Value::TimestampTz(row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)?)
        }
        "BYTEA" => Value::Binary(row.try_get::<Vec<u8>, _>(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "UNKNOWN" => {
            Value::Text(row.try_get::<String, _>(index)?)
        }
        _ => return Ok(None),
    };

    Ok(Some(value))
}

/// Shortest f32 text re-read as f64, so 0.1 does not become 0.10000000149011612.
fn widen_f32(value: f32) -> f64 {
    value
        .to_string()
        .parse::<f64>()
        .unwrap_or_else(|_| f64::from(value))
}

/// Recognizes the binary NUMERIC encodings of NaN and the infinities.
///
/// The header is four big-endian 16-bit words (`ndigits`, `weight`, `sign`,
/// `dscale`); the special values are flagged in `sign`.
fn numeric_special_value(bytes: &[u8]) -> Option<&'static str> {
    const NUMERIC_NAN: u16 = 0xC000;
    const NUMERIC_PINF: u16 = 0xD000;
    const NUMERIC_NINF: u16 = 0xF000;

    let sign = u16::from_be_bytes([*bytes.get(4)?, *bytes.get(5)?]);
    match sign {
        NUMERIC_NAN => Some("NaN"),
        NUMERIC_PINF => Some("Infinity"),
        NUMERIC_NINF => Some("-Infinity"),
        _ => None,
    }
}
