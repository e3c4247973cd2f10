//! Handshake state machine.
//!
//! Brings a freshly connected TCP stream to an authenticated, query-ready
//! channel. The caller owns the socket and drives the machine: write the
//! opening bytes from [`Handshake::new`], then feed each zero-terminated
//! server message to [`Handshake::advance`] and act on the result.
//!
//! V0_4 (legacy):
//! ```text
//! C -> S: u32 LE 0x400C2D20 | u32 LE key_len | key | u32 LE 0x7E6970C7
//! S -> C: zero-terminated ASCII, "SUCCESS" on success
//! ```
//!
//! V1_0 (default):
//! ```text
//! C -> S: u32 LE 0x34C2BDC3
//! S -> C: {"success":true,"min_protocol_version":...,"server_version":...}
//! C -> S: {"protocol_version":0,"authentication_method":"SCRAM-SHA-256",
//!          "authentication":<client-first>}
//! S -> C: {"success":true,"authentication":<server-first>}
//! C -> S: {"authentication":<client-final>}
//! S -> C: {"success":true,"authentication":<server-final>}
//! ```
//! All V1_0 messages are zero-terminated JSON in both directions.

use serde::{Deserialize, Serialize};

use crate::constant::{
    HANDSHAKE_V0_4_MAGIC, HANDSHAKE_V1_0_MAGIC, ProtocolVersion, SUB_PROTOCOL_VERSION,
    WIRE_PROTOCOL_JSON,
};
use crate::error::{Error, Result};
use crate::protocol::primitive::write_int_4;
use crate::protocol::scram::ScramClient;

/// What the caller should do after feeding one server message.
#[derive(Debug)]
pub enum HandshakeResult {
    /// Write these bytes to the socket (terminators included), then read
    /// the next zero-terminated reply.
    Write(Vec<u8>),
    /// Authentication finished; the channel is query-ready.
    Connected { server_version: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SentMagic,
    SentClientFirst,
    SentClientFinal,
    Authenticated,
}

/// Server messages share one envelope across all V1_0 steps.
#[derive(Deserialize)]
struct ServerMessage {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    min_protocol_version: Option<i64>,
    #[serde(default)]
    max_protocol_version: Option<i64>,
    #[serde(default)]
    server_version: Option<String>,
    #[serde(default)]
    authentication: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Serialize)]
struct ClientFirstMessage<'a> {
    protocol_version: i64,
    authentication_method: &'a str,
    authentication: String,
}

#[derive(Serialize)]
struct ClientFinalMessage {
    authentication: String,
}

// Server error codes in this range are authentication failures rather than
// protocol-level rejections.
const AUTH_ERROR_CODES: core::ops::RangeInclusive<i64> = 10..=20;

pub struct Handshake {
    state: State,
    protocol: ProtocolVersion,
    scram: Option<ScramClient>,
    server_version: Option<String>,
}

impl Handshake {
    /// Create the state machine. The returned bytes open the handshake and
    /// must be written to the socket before reading anything.
    ///
    /// For V0_4, `username` is the plaintext auth key (possibly empty) and
    /// `password` is unused. For V1_0 both feed SCRAM.
    pub fn new(protocol: ProtocolVersion, username: &str, password: &str) -> (Self, Vec<u8>) {
        let mut opening = Vec::new();
        let scram = match protocol {
            ProtocolVersion::V0_4 => {
                write_int_4(&mut opening, HANDSHAKE_V0_4_MAGIC);
                write_int_4(&mut opening, username.len() as u32);
                opening.extend_from_slice(username.as_bytes());
                write_int_4(&mut opening, WIRE_PROTOCOL_JSON);
                None
            }
            ProtocolVersion::V1_0 => {
                write_int_4(&mut opening, HANDSHAKE_V1_0_MAGIC);
                Some(ScramClient::new(username, password))
            }
        };

        (
            Self {
                state: State::SentMagic,
                protocol,
                scram,
                server_version: None,
            },
            opening,
        )
    }

    /// Feed one server message (zero-terminator already stripped).
    pub fn advance(&mut self, message: &[u8]) -> Result<HandshakeResult> {
        match (self.protocol, self.state) {
            (_, State::Authenticated) => {
                Err(Error::Bug("handshake already complete".to_string()))
            }
            (ProtocolVersion::V0_4, State::SentMagic) => self.advance_v0_4(message),
            (ProtocolVersion::V0_4, _) => {
                Err(Error::Bug("V0_4 handshake has a single reply".to_string()))
            }
            (ProtocolVersion::V1_0, _) => self.advance_v1_0(message),
        }
    }

    fn advance_v0_4(&mut self, message: &[u8]) -> Result<HandshakeResult> {
        if message == b"SUCCESS" {
            self.state = State::Authenticated;
            Ok(HandshakeResult::Connected {
                server_version: None,
            })
        } else {
            Err(Error::Handshake(
                String::from_utf8_lossy(message).into_owned(),
            ))
        }
    }

    fn advance_v1_0(&mut self, message: &[u8]) -> Result<HandshakeResult> {
        let text = match simdutf8::basic::from_utf8(message) {
            Ok(text) => text,
            Err(_) => {
                return Err(Error::Handshake(
                    String::from_utf8_lossy(message).into_owned(),
                ));
            }
        };

        // The server reports pre-handshake failures as a bare (non-JSON)
        // zero-terminated string.
        let reply: ServerMessage = match serde_json::from_str(text) {
            Ok(reply) => reply,
            Err(_) => return Err(Error::Handshake(text.to_string())),
        };

        if reply.success != Some(true) {
            return Err(self.rejection(reply, text));
        }

        match self.state {
            State::SentMagic => {
                let min = reply.min_protocol_version.unwrap_or(SUB_PROTOCOL_VERSION);
                let max = reply.max_protocol_version.unwrap_or(SUB_PROTOCOL_VERSION);
                if SUB_PROTOCOL_VERSION < min || SUB_PROTOCOL_VERSION > max {
                    return Err(Error::Handshake(format!(
                        "server supports protocol versions [{}, {}], client speaks {}",
                        min, max, SUB_PROTOCOL_VERSION
                    )));
                }
                self.server_version = reply.server_version;

                let scram = self.scram_mut()?;
                let first = ClientFirstMessage {
                    protocol_version: SUB_PROTOCOL_VERSION,
                    authentication_method: "SCRAM-SHA-256",
                    authentication: scram.client_first(),
                };
                self.state = State::SentClientFirst;
                Ok(HandshakeResult::Write(terminated_json(&first)?))
            }
            State::SentClientFirst => {
                let server_first = reply.authentication.ok_or_else(|| {
                    Error::Auth("server-first message missing authentication".to_string())
                })?;
                let client_final = self.scram_mut()?.client_final(&server_first)?;
                self.state = State::SentClientFinal;
                Ok(HandshakeResult::Write(terminated_json(
                    &ClientFinalMessage {
                        authentication: client_final,
                    },
                )?))
            }
            State::SentClientFinal => {
                let server_final = reply.authentication.ok_or_else(|| {
                    Error::Auth("server-final message missing authentication".to_string())
                })?;
                self.scram_mut()?.verify_server_final(&server_final)?;
                self.state = State::Authenticated;
                Ok(HandshakeResult::Connected {
                    server_version: self.server_version.take(),
                })
            }
            State::Authenticated => Err(Error::Bug("handshake already complete".to_string())),
        }
    }

    fn rejection(&self, reply: ServerMessage, raw: &str) -> Error {
        let message = reply.error.unwrap_or_else(|| raw.to_string());
        let auth_code = reply.error_code.is_some_and(|c| AUTH_ERROR_CODES.contains(&c));
        if auth_code || self.state != State::SentMagic {
            Error::Auth(message)
        } else {
            Error::Handshake(message)
        }
    }

    fn scram_mut(&mut self) -> Result<&mut ScramClient> {
        self.scram
            .as_mut()
            .ok_or_else(|| Error::Bug("V1_0 handshake without SCRAM state".to_string()))
    }
}

fn terminated_json<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(message)
        .map_err(|e| Error::Bug(format!("handshake message serialization: {}", e)))?;
    bytes.push(0);
    Ok(bytes)
}
