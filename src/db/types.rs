//! PostgreSQL value to JSON conversion.
//!
//! Values are shaped the way conventional PostgreSQL drivers hand them to
//! JSON consumers: 64-bit integers and NUMERIC as strings (no precision
//! loss), smaller integers and floats as numbers, dates and times as ISO-8601
//! strings, bytea as base64. Anything without a dedicated mapping falls back
//! to PostgreSQL's text representation.
//!
//! Rows arrive in text format from the simple-query protocol and in binary
//! format from prepared statements; every decoder here handles both.

use crate::models::{Field, Row};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgColumn, PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::types::BigDecimal;
use sqlx::{Column, Decode, Postgres, Row as _, Type, TypeInfo, ValueRef};

// =============================================================================
// Text Fallback
// =============================================================================

/// Any value as its textual form.
///
/// Text-format values are taken as-is. Binary values are read as UTF-8 and
/// otherwise base64-encoded.
#[derive(Debug)]
pub struct RawText(pub String);

impl Type<Postgres> for RawText {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

impl<'r> Decode<'r, Postgres> for RawText {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        if value.format() == PgValueFormat::Text {
            return Ok(RawText(value.as_str()?.to_string()));
        }
        let bytes = value.as_bytes()?;
        Ok(RawText(match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => STANDARD.encode(bytes),
        }))
    }
}

// =============================================================================
// Row Conversion
// =============================================================================

/// Convert a row to a column-name keyed JSON map.
pub fn row_to_json(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), decode_column(row, col.ordinal())))
        .collect()
}

/// Field metadata (name and type OID) for a set of columns.
pub fn fields_of(columns: &[PgColumn]) -> Vec<Field> {
    columns
        .iter()
        .map(|col| Field::new(col.name(), col.type_info().oid().map(|oid| oid.0).unwrap_or(0)))
        .collect()
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn array_value<T>(values: Vec<Option<T>>, f: impl Fn(T) -> JsonValue) -> JsonValue {
    JsonValue::Array(
        values
            .into_iter()
            .map(|v| v.map(&f).unwrap_or(JsonValue::Null))
            .collect(),
    )
}

fn date_string(v: NaiveDate) -> JsonValue {
    JsonValue::String(v.to_string())
}

fn time_string(v: NaiveTime) -> JsonValue {
    JsonValue::String(v.to_string())
}

fn timestamp_string(v: NaiveDateTime) -> JsonValue {
    JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn timestamptz_string(v: DateTime<Utc>) -> JsonValue {
    JsonValue::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn decimal_string(v: BigDecimal) -> JsonValue {
    JsonValue::String(v.to_plain_string())
}

/// NUMERIC as a string.
///
/// Text-format values are the server's own rendering and are kept as-is.
/// Binary values go through `BigDecimal`; NaN cannot be represented there
/// and falls back to text.
fn numeric_value(row: &PgRow, idx: usize) -> Option<JsonValue> {
    let raw = row.try_get_raw(idx).ok()?;
    if raw.format() == PgValueFormat::Text {
        return raw.as_str().ok().map(|s| JsonValue::String(s.to_string()));
    }
    row.try_get::<BigDecimal, _>(idx).ok().map(decimal_string)
}

/// Decode one column. NULL is `null`; decode failures fall back to text.
pub fn decode_column(row: &PgRow, idx: usize) -> JsonValue {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return JsonValue::Null,
        Ok(_) => {}
        Err(_) => return JsonValue::Null,
    }

    let type_name = row.column(idx).type_info().name().to_uppercase();
    let decoded = match type_name.as_str() {
        "INT2" => row.try_get::<i16, _>(idx).ok().map(JsonValue::from),
        "INT4" => row.try_get::<i32, _>(idx).ok().map(JsonValue::from),
        "OID" => row.try_get::<Oid, _>(idx).ok().map(|v| JsonValue::from(v.0)),
        "INT8" => row
            .try_get::<i64, _>(idx)
            .ok()
            .map(|v| JsonValue::String(v.to_string())),
        "FLOAT4" => row
            .try_get::<f32, _>(idx)
            .ok()
            .map(|v| float_value(v as f64)),
        "FLOAT8" => row.try_get::<f64, _>(idx).ok().map(float_value),
        "BOOL" => row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool),
        "JSON" | "JSONB" => row.try_get::<JsonValue, _>(idx).ok(),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(idx)
            .ok()
            .map(|v| JsonValue::String(v.to_string())),
        "NUMERIC" => numeric_value(row, idx),
        "DATE" => row.try_get::<NaiveDate, _>(idx).ok().map(date_string),
        "TIME" => row.try_get::<NaiveTime, _>(idx).ok().map(time_string),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(idx)
            .ok()
            .map(timestamp_string),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(idx)
            .ok()
            .map(timestamptz_string),
        "BYTEA" => row
            .try_get::<Vec<u8>, _>(idx)
            .ok()
            .map(|v| JsonValue::String(STANDARD.encode(v))),
        "INT2[]" => row
            .try_get::<Vec<Option<i16>>, _>(idx)
            .ok()
            .map(|v| array_value(v, JsonValue::from)),
        "INT4[]" => row
            .try_get::<Vec<Option<i32>>, _>(idx)
            .ok()
            .map(|v| array_value(v, JsonValue::from)),
        "INT8[]" => row
            .try_get::<Vec<Option<i64>>, _>(idx)
            .ok()
            .map(|v| array_value(v, |n| JsonValue::String(n.to_string()))),
        "FLOAT4[]" => row
            .try_get::<Vec<Option<f32>>, _>(idx)
            .ok()
            .map(|v| array_value(v, |n| float_value(n as f64))),
        "FLOAT8[]" => row
            .try_get::<Vec<Option<f64>>, _>(idx)
            .ok()
            .map(|v| array_value(v, float_value)),
        "BOOL[]" => row
            .try_get::<Vec<Option<bool>>, _>(idx)
            .ok()
            .map(|v| array_value(v, JsonValue::Bool)),
        "TEXT[]" | "VARCHAR[]" | "NAME[]" | "BPCHAR[]" => row
            .try_get::<Vec<Option<String>>, _>(idx)
            .ok()
            .map(|v| array_value(v, JsonValue::String)),
        "UUID[]" => row
            .try_get::<Vec<Option<uuid::Uuid>>, _>(idx)
            .ok()
            .map(|v| array_value(v, |u| JsonValue::String(u.to_string()))),
        "NUMERIC[]" => row
            .try_get::<Vec<Option<BigDecimal>>, _>(idx)
            .ok()
            .map(|v| array_value(v, decimal_string)),
        "DATE[]" => row
            .try_get::<Vec<Option<NaiveDate>>, _>(idx)
            .ok()
            .map(|v| array_value(v, date_string)),
        "TIME[]" => row
            .try_get::<Vec<Option<NaiveTime>>, _>(idx)
            .ok()
            .map(|v| array_value(v, time_string)),
        "TIMESTAMP[]" => row
            .try_get::<Vec<Option<NaiveDateTime>>, _>(idx)
            .ok()
            .map(|v| array_value(v, timestamp_string)),
        "TIMESTAMPTZ[]" => row
            .try_get::<Vec<Option<DateTime<Utc>>>, _>(idx)
            .ok()
            .map(|v| array_value(v, timestamptz_string)),
        "JSONB[]" => row
            .try_get::<Vec<Option<JsonValue>>, _>(idx)
            .ok()
            .map(|v| array_value(v, |j| j)),
        _ => None,
    };

    decoded.unwrap_or_else(|| decode_text(row, idx, &type_name))
}

fn decode_text(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
    match row.try_get::<RawText, _>(idx) {
        Ok(v) => JsonValue::String(v.0),
        Err(e) => {
            tracing::warn!(column = idx, column_type = type_name, error = %e, "Failed to decode column");
            JsonValue::Null
        }
    }
}
