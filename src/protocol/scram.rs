//! SCRAM-SHA-256 client side of RFC 5802, as spoken inside the V1_0
//! handshake envelope.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 18;

/// State carried from `client_final` to `verify_server_final`.
struct Verifier {
    auth_message: String,
    server_key: [u8; 32],
}

/// One SCRAM exchange. Created per handshake, discarded on completion.
pub struct ScramClient {
    username: String,
    password: String,
    nonce: String,
    verifier: Option<Verifier>,
}

impl ScramClient {
    pub fn new(username: &str, password: &str) -> Self {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        Self::with_nonce(username, password, BASE64.encode(nonce_bytes))
    }

    fn with_nonce(username: &str, password: &str, nonce: String) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            nonce,
            verifier: None,
        }
    }

    /// `n,,n=<user>,r=<nonce>`; no channel binding over plaintext TCP.
    pub fn client_first(&self) -> String {
        format!("n,,{}", self.client_first_bare())
    }

    fn client_first_bare(&self) -> String {
        format!("n={},r={}", saslname(&self.username), self.nonce)
    }

    /// Consume the server-first message and produce the client-final
    /// message carrying the proof.
    pub fn client_final(&mut self, server_first: &str) -> Result<String> {
        let (server_nonce, salt_b64, iterations) = parse_server_first(server_first)?;

        // The combined nonce must extend ours, or someone is replaying.
        if !server_nonce.starts_with(&self.nonce) {
            return Err(Error::Auth(
                "server nonce does not extend the client nonce".to_string(),
            ));
        }

        let salt = BASE64
            .decode(salt_b64)
            .map_err(|_| Error::Auth("invalid base64 salt in server-first".to_string()))?;

        let salted_password = hi(self.password.as_bytes(), &salt, iterations)?;
        let client_key = mac(&salted_password, b"Client Key")?;
        let stored_key: [u8; 32] = Sha256::digest(client_key).into();
        let server_key = mac(&salted_password, b"Server Key")?;

        let client_final_without_proof = format!("c=biws,r={}", server_nonce);
        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare(),
            server_first,
            client_final_without_proof
        );

        let client_signature = mac(&stored_key, auth_message.as_bytes())?;
        let mut proof = client_key;
        for (p, s) in proof.iter_mut().zip(client_signature.iter()) {
            *p ^= s;
        }

        self.verifier = Some(Verifier {
            auth_message,
            server_key,
        });

        Ok(format!(
            "{},p={}",
            client_final_without_proof,
            BASE64.encode(proof)
        ))
    }

    /// Check the server's `v=<signature>` against the expected signature.
    pub fn verify_server_final(&self, server_final: &str) -> Result<()> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| Error::Bug("server-final verified before client-final".to_string()))?;

        let signature_b64 = server_final
            .strip_prefix("v=")
            .ok_or_else(|| Error::Auth("missing 'v=' in server-final".to_string()))?;
        let signature = BASE64
            .decode(signature_b64)
            .map_err(|_| Error::Auth("invalid base64 server signature".to_string()))?;

        let expected = mac(&verifier.server_key, verifier.auth_message.as_bytes())?;
        if constant_time_eq(&signature, &expected) {
            Ok(())
        } else {
            Err(Error::Auth(
                "server signature verification failed".to_string(),
            ))
        }
    }
}

/// `r=<nonce>,s=<salt>,i=<iterations>`; extra attributes are ignored.
fn parse_server_first(msg: &str) -> Result<(&str, &str, u32)> {
    let mut nonce = None;
    let mut salt = None;
    let mut iterations = None;

    for part in msg.split(',') {
        if let Some(v) = part.strip_prefix("r=") {
            nonce = Some(v);
        } else if let Some(v) = part.strip_prefix("s=") {
            salt = Some(v);
        } else if let Some(v) = part.strip_prefix("i=") {
            iterations = Some(v);
        }
    }

    match (nonce, salt, iterations) {
        (Some(nonce), Some(salt), Some(i)) if !nonce.is_empty() && !salt.is_empty() => {
            let iterations = i
                .parse::<u32>()
                .map_err(|_| Error::Auth(format!("invalid iteration count '{}'", i)))?;
            Ok((nonce, salt, iterations))
        }
        _ => Err(Error::Auth(
            "missing fields in server-first message".to_string(),
        )),
    }
}

/// Hi() from RFC 5802: PBKDF2-HMAC-SHA256.
fn hi(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; 32]> {
    let mut out = [0u8; 32];
    pbkdf2::pbkdf2::<HmacSha256>(password, salt, iterations, &mut out)
        .map_err(|e| Error::Bug(format!("pbkdf2 output length: {}", e)))?;
    Ok(out)
}

fn mac(key: &[u8], data: &[u8]) -> Result<[u8; 32]> {
    let mut hmac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::Bug(format!("hmac key length: {}", e)))?;
    hmac.update(data);
    Ok(hmac.finalize().into_bytes().into())
}

/// `=` and `,` are reserved in saslname values.
fn saslname(name: &str) -> String {
    name.replace('=', "=3D").replace(',', "=2C")
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
