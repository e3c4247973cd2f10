/// Magic number opening a V0_4 (legacy) handshake.
pub const HANDSHAKE_V0_4_MAGIC: u32 = 0x400C_2D20;

/// Magic number opening a V1_0 (SCRAM-SHA-256) handshake.
pub const HANDSHAKE_V1_0_MAGIC: u32 = 0x34C2_BDC3;

/// Wire format selector sent during the V0_4 handshake. Only JSON is supported.
pub const WIRE_PROTOCOL_JSON: u32 = 0x7E69_70C7;

/// Sub-protocol version negotiated inside the V1_0 handshake envelope.
pub const SUB_PROTOCOL_VERSION: i64 = 0;

/// First query token handed out by a fresh process.
///
/// Tokens only need to be unique per connection, but the allocator is
/// process-global so a token is never reused anywhere in the process.
pub const TOKEN_SEED: u64 = 0x5ADFACE;

pub const DEFAULT_PORT: u16 = 28015;
pub const DEFAULT_USER: &str = "admin";

/// Handshake protocol revision spoken on a fresh TCP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Legacy handshake: plaintext auth key, no SCRAM.
    V0_4,
    /// Current handshake with SCRAM-SHA-256 authentication.
    V1_0,
}

/// First element of the JSON array in a client->server query payload.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Start = 1,
    Continue = 2,
    Stop = 3,
    NoreplyWait = 4,
    ServerInfo = 5,
}

/// The `t` field of a server response envelope.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    SuccessAtom = 1,
    SuccessSequence = 2,
    SuccessPartial = 3,
    WaitComplete = 4,
    ClientError = 16,
    CompileError = 17,
    RuntimeError = 18,
}

impl ResponseType {
    /// Map a raw `t` code to a known response type.
    ///
    /// Unrecognized codes return `None` so the caller can pass them through
    /// instead of failing the connection.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::SuccessAtom),
            2 => Some(Self::SuccessSequence),
            3 => Some(Self::SuccessPartial),
            4 => Some(Self::WaitComplete),
            16 => Some(Self::ClientError),
            17 => Some(Self::CompileError),
            18 => Some(Self::RuntimeError),
            _ => None,
        }
    }
}
