//! Decoded result values.
//!
//! The server speaks plain JSON, with compound values (timestamps, byte
//! strings) smuggled through objects tagged with a reserved `$reql_type$`
//! key. Those are rewritten into native values at decode time.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

pub const REQL_TYPE_KEY: &str = "$reql_type$";

/// A single decoded value returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// A `$reql_type$: BINARY` object.
    Binary(Vec<u8>),
    /// A `$reql_type$: TIME` object, offset preserved.
    Time(DateTime<FixedOffset>),
    Array(Vec<Datum>),
    Object(BTreeMap<String, Datum>),
}

/// Decode one JSON value, rewriting `$reql_type$` compounds.
pub fn decode_datum(value: Value) -> Result<Datum> {
    match value {
        Value::Null => Ok(Datum::Null),
        Value::Bool(b) => Ok(Datum::Bool(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Datum::Int(i)),
            None => n
                .as_f64()
                .map(Datum::Float)
                .ok_or_else(|| Error::Protocol(format!("unrepresentable number {}", n))),
        },
        Value::String(s) => Ok(Datum::String(s)),
        Value::Array(values) => Ok(Datum::Array(
            values
                .into_iter()
                .map(decode_datum)
                .collect::<Result<Vec<_>>>()?,
        )),
        Value::Object(map) => match map.get(REQL_TYPE_KEY).and_then(Value::as_str) {
            Some("TIME") => decode_time(&map),
            Some("BINARY") => decode_binary(&map),
            Some(other) => {
                warn!(reql_type = other, "passing through unrecognized $reql_type$");
                decode_object(map)
            }
            None => decode_object(map),
        },
    }
}

fn decode_object(map: serde_json::Map<String, Value>) -> Result<Datum> {
    let mut object = BTreeMap::new();
    for (key, value) in map {
        object.insert(key, decode_datum(value)?);
    }
    Ok(Datum::Object(object))
}

/// `{"$reql_type$":"TIME","epoch_time":1375147296.681,"timezone":"-07:00"}`
fn decode_time(map: &serde_json::Map<String, Value>) -> Result<Datum> {
    let epoch = map
        .get("epoch_time")
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::Protocol("TIME datum missing epoch_time".to_string()))?;
    let timezone = map
        .get("timezone")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Protocol("TIME datum missing timezone".to_string()))?;

    let offset = parse_utc_offset(timezone)?;

    if !epoch.is_finite() {
        return Err(Error::Protocol(format!("TIME epoch_time {} not finite", epoch)));
    }
    let mut secs = epoch.floor();
    let mut nanos = ((epoch - secs) * 1e9).round();
    if nanos >= 1e9 {
        secs += 1.0;
        nanos = 0.0;
    }
    if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return Err(Error::Protocol(format!("TIME epoch_time {} out of range", epoch)));
    }

    let utc = DateTime::from_timestamp(secs as i64, nanos as u32)
        .ok_or_else(|| Error::Protocol(format!("TIME epoch_time {} out of range", epoch)))?;
    Ok(Datum::Time(utc.with_timezone(&offset)))
}

/// `{"$reql_type$":"BINARY","data":"<base64>"}`
fn decode_binary(map: &serde_json::Map<String, Value>) -> Result<Datum> {
    let data = map
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Protocol("BINARY datum missing data".to_string()))?;
    let bytes = BASE64
        .decode(data)
        .map_err(|e| Error::Protocol(format!("BINARY datum with invalid base64: {}", e)))?;
    Ok(Datum::Binary(bytes))
}

/// Parse an ISO-8601 UTC offset: `Z`, `+HH`, `+HH:MM` or `+HHMM`.
fn parse_utc_offset(timezone: &str) -> Result<FixedOffset> {
    let invalid = || Error::Protocol(format!("invalid timezone offset '{}'", timezone));

    if timezone == "Z" || timezone == "z" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let bytes = timezone.as_bytes();
    let sign = match bytes.first() {
        Some(b'+') => 1i32,
        Some(b'-') => -1i32,
        _ => return Err(invalid()),
    };

    let digit = |b: u8| -> Result<i32> {
        if b.is_ascii_digit() {
            Ok(i32::from(b - b'0'))
        } else {
            Err(invalid())
        }
    };

    let (hours, minutes) = match &bytes[1..] {
        [h1, h2] => (digit(*h1)? * 10 + digit(*h2)?, 0),
        [h1, h2, m1, m2] => (digit(*h1)? * 10 + digit(*h2)?, digit(*m1)? * 10 + digit(*m2)?),
        [h1, h2, b':', m1, m2] => {
            (digit(*h1)? * 10 + digit(*h2)?, digit(*m1)? * 10 + digit(*m2)?)
        }
        _ => return Err(invalid()),
    };

    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
