//! Decoding of the server response envelope.
//!
//! Envelope format:
//! ```text
//! {
//!   "t": <response type code>,
//!   "r": [<results>],
//!   "b": <backtrace, errors only>,
//!   "n": [<note codes>],
//!   "p": <profile, when profiling was requested>
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::constant::ResponseType;
use crate::error::{Error, QueryErrorKind, Result};
use crate::protocol::datum::{Datum, decode_datum};

#[derive(Deserialize)]
struct RawEnvelope {
    t: i64,
    #[serde(default)]
    r: Option<Value>,
    #[serde(default)]
    b: Option<Value>,
    #[serde(default)]
    n: Option<Vec<i64>>,
    #[serde(default)]
    p: Option<Value>,
}

/// What one response frame carried, before any cursor is attached.
#[derive(Debug)]
pub enum Payload {
    /// A single value (SUCCESS_ATOM, or SUCCESS_SEQUENCE of scalars).
    Atom(Datum),
    /// A batch of documents. `more` is set for SUCCESS_PARTIAL, meaning the
    /// server holds further batches behind the same token.
    Rows { docs: Vec<Datum>, more: bool },
    /// Acknowledgement of NOREPLY_WAIT.
    WaitComplete,
    /// A per-query error reported by the server.
    Error {
        kind: QueryErrorKind,
        message: String,
    },
    /// Response type code this driver does not know.
    Unknown { code: i64 },
}

#[derive(Debug)]
pub struct DecodedResponse {
    pub payload: Payload,
    pub backtrace: Option<Value>,
    pub notes: Vec<i64>,
    pub profile: Option<Value>,
}

/// Decode one response payload. Failure here is fatal to the connection:
/// the stream can no longer be trusted to be frame-aligned with reality.
pub fn decode_response(payload: &[u8]) -> Result<DecodedResponse> {
    let raw: RawEnvelope = serde_json::from_slice(payload)
        .map_err(|e| Error::Protocol(format!("invalid response envelope: {}", e)))?;

    let payload = match ResponseType::from_code(raw.t) {
        None => Payload::Unknown { code: raw.t },
        Some(ResponseType::WaitComplete) => Payload::WaitComplete,
        Some(ResponseType::SuccessAtom) => Payload::Atom(decode_datum(single_result(raw.r)?)?),
        Some(ResponseType::SuccessSequence) => decode_sequence(raw.r, false)?,
        Some(ResponseType::SuccessPartial) => decode_sequence(raw.r, true)?,
        Some(ResponseType::ClientError) => decode_error(raw.r, QueryErrorKind::Client)?,
        Some(ResponseType::CompileError) => decode_error(raw.r, QueryErrorKind::Compile)?,
        Some(ResponseType::RuntimeError) => decode_error(raw.r, QueryErrorKind::Runtime)?,
    };

    Ok(DecodedResponse {
        payload,
        backtrace: raw.b,
        notes: raw.n.unwrap_or_default(),
        profile: raw.p,
    })
}

/// Atoms and errors carry exactly one element in `r`.
fn single_result(r: Option<Value>) -> Result<Value> {
    let Some(Value::Array(mut results)) = r else {
        return Err(Error::Protocol("response 'r' is not an array".to_string()));
    };
    if results.len() != 1 {
        return Err(Error::Protocol(format!(
            "expected a single result, got {}",
            results.len()
        )));
    }
    Ok(results.swap_remove(0))
}

/// A sequence of objects is a row batch; a sequence of scalars is a single
/// array value. Partial batches always stay row batches so the cursor has
/// something to continue.
fn decode_sequence(r: Option<Value>, more: bool) -> Result<Payload> {
    let Some(Value::Array(results)) = r else {
        return Err(Error::Protocol("response 'r' is not an array".to_string()));
    };

    let all_objects = results.iter().all(Value::is_object);
    let docs = results
        .into_iter()
        .map(decode_datum)
        .collect::<Result<Vec<_>>>()?;

    if !more && !all_objects {
        return Ok(Payload::Atom(Datum::Array(docs)));
    }
    Ok(Payload::Rows { docs, more })
}

fn decode_error(r: Option<Value>, kind: QueryErrorKind) -> Result<Payload> {
    let message = match single_result(r)? {
        Value::String(message) => message,
        other => {
            return Err(Error::Protocol(format!(
                "error response with non-string message: {}",
                other
            )));
        }
    };
    Ok(Payload::Error { kind, message })
}
