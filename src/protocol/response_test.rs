use pretty_assertions::assert_eq;

use super::response::{Payload, decode_response};
use crate::error::QueryErrorKind;
use crate::protocol::datum::Datum;

#[test]
fn success_atom() {
    let decoded = decode_response(br#"{"t":1,"r":[1]}"#).unwrap();
    let Payload::Atom(datum) = decoded.payload else {
        panic!("expected atom");
    };
    assert_eq!(datum, Datum::Int(1));
}

#[test]
fn success_atom_wrong_arity() {
    assert!(decode_response(br#"{"t":1,"r":[]}"#).is_err());
    assert!(decode_response(br#"{"t":1,"r":[1,2]}"#).is_err());
    assert!(decode_response(br#"{"t":1,"r":1}"#).is_err());
    assert!(decode_response(br#"{"t":1}"#).is_err());
}

#[test]
fn success_sequence_of_objects() {
    let decoded = decode_response(br#"{"t":2,"r":[{"id":0},{"id":1}]}"#).unwrap();
    let Payload::Rows { docs, more } = decoded.payload else {
        panic!("expected rows");
    };
    assert!(!more);
    assert_eq!(docs.len(), 2);
    assert_eq!(
        docs[0],
        Datum::Object([("id".to_string(), Datum::Int(0))].into_iter().collect())
    );
}

#[test]
fn success_sequence_of_scalars_is_an_array_value() {
    let decoded = decode_response(br#"{"t":2,"r":[1,2,3]}"#).unwrap();
    let Payload::Atom(datum) = decoded.payload else {
        panic!("expected atom");
    };
    assert_eq!(
        datum,
        Datum::Array(vec![Datum::Int(1), Datum::Int(2), Datum::Int(3)])
    );
}

#[test]
fn empty_sequence_is_an_empty_batch() {
    let decoded = decode_response(br#"{"t":2,"r":[]}"#).unwrap();
    let Payload::Rows { docs, more } = decoded.payload else {
        panic!("expected rows");
    };
    assert!(docs.is_empty());
    assert!(!more);
}

#[test]
fn success_partial_sets_more() {
    let decoded = decode_response(br#"{"t":3,"r":[{"id":0},{"id":1}]}"#).unwrap();
    let Payload::Rows { docs, more } = decoded.payload else {
        panic!("expected rows");
    };
    assert!(more);
    assert_eq!(docs.len(), 2);
}

#[test]
fn partial_scalars_stay_a_batch() {
    // A partial of scalars must still expose rows so the continuation has
    // somewhere to deliver the rest.
    let decoded = decode_response(br#"{"t":3,"r":[1,2]}"#).unwrap();
    let Payload::Rows { docs, more } = decoded.payload else {
        panic!("expected rows");
    };
    assert!(more);
    assert_eq!(docs, vec![Datum::Int(1), Datum::Int(2)]);
}

#[test]
fn wait_complete() {
    let decoded = decode_response(br#"{"t":4,"r":[]}"#).unwrap();
    assert!(matches!(decoded.payload, Payload::WaitComplete));
}

#[test]
fn error_responses() {
    for (code, kind) in [
        (16, QueryErrorKind::Client),
        (17, QueryErrorKind::Compile),
        (18, QueryErrorKind::Runtime),
    ] {
        let raw = format!(r#"{{"t":{},"r":["No such table."]}}"#, code);
        let decoded = decode_response(raw.as_bytes()).unwrap();
        let Payload::Error {
            kind: got,
            message,
        } = decoded.payload
        else {
            panic!("expected error payload");
        };
        assert_eq!(got, kind);
        assert_eq!(message, "No such table.");
    }
}

#[test]
fn error_with_backtrace() {
    let decoded =
        decode_response(br#"{"t":18,"r":["boom"],"b":[0,"frames"]}"#).unwrap();
    assert!(decoded.backtrace.is_some());
}

#[test]
fn notes_and_profile_are_exposed() {
    let decoded =
        decode_response(br#"{"t":2,"r":[],"n":[1,2],"p":{"ms":1.5}}"#).unwrap();
    assert_eq!(decoded.notes, vec![1, 2]);
    assert!(decoded.profile.is_some());
}

#[test]
fn unknown_type_code_passes_through() {
    let decoded = decode_response(br#"{"t":99,"r":["whatever"]}"#).unwrap();
    let Payload::Unknown { code } = decoded.payload else {
        panic!("expected unknown");
    };
    assert_eq!(code, 99);
}

#[test]
fn malformed_envelopes() {
    assert!(decode_response(b"").is_err());
    assert!(decode_response(b"not json").is_err());
    assert!(decode_response(br#"{"r":[1]}"#).is_err());
    assert!(decode_response(br#"{"t":"atom","r":[1]}"#).is_err());
    assert!(decode_response(br#"{"t":18,"r":[42]}"#).is_err());
    assert!(decode_response(br#"{"t":2,"r":{"id":0}}"#).is_err());
}
