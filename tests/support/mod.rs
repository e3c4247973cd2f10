//! An in-process RethinkDB stand-in: accepts one connection, speaks the
//! server side of the handshake, then follows a per-test script of frames.

use std::net::SocketAddr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub const V0_4_MAGIC: u32 = 0x400C2D20;
pub const V1_0_MAGIC: u32 = 0x34C2BDC3;
pub const JSON_PROTOCOL_MAGIC: u32 = 0x7E6970C7;

pub struct MockServer {
    pub addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    /// URL for connecting to this server.
    pub fn url(&self) -> String {
        format!("rethinkdb://admin@{}", self.addr)
    }

    /// Wait for the server script to finish, propagating its panics.
    pub async fn finished(self) {
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                std::panic::resume_unwind(e.into_panic());
            }
        }
    }
}

/// Bind an ephemeral port and run `script` against the first connection.
pub async fn spawn<F, Fut>(script: F) -> MockServer
where
    F: FnOnce(Session) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _peer) = listener.accept().await.unwrap();
        script(Session::new(stream)).await;
    });
    MockServer { addr, handle }
}

pub struct Session {
    stream: BufReader<TcpStream>,
}

impl Session {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    pub async fn read_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.stream.read_exact(&mut buf).await.unwrap();
        u32::from_le_bytes(buf)
    }

    pub async fn read_bytes(&mut self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        self.stream.read_exact(&mut buf).await.unwrap();
        buf
    }

    /// Read a zero-terminated message, terminator stripped.
    pub async fn read_terminated(&mut self) -> String {
        let mut buf = Vec::new();
        self.stream.read_until(0, &mut buf).await.unwrap();
        assert_eq!(buf.pop(), Some(0), "client message not terminated");
        String::from_utf8(buf).unwrap()
    }

    /// Write `text` followed by the zero terminator.
    pub async fn send_terminated(&mut self, text: &str) {
        let stream = self.stream.get_mut();
        stream.write_all(text.as_bytes()).await.unwrap();
        stream.write_all(&[0]).await.unwrap();
    }

    /// Server side of the V1_0 handshake, accepting any client proof and
    /// signing with `password`. A client holding a different password will
    /// reject our signature.
    pub async fn handshake_v1(&mut self, password: &str) {
        assert_eq!(self.read_u32().await, V1_0_MAGIC);
        self.send_terminated(
            r#"{"success":true,"min_protocol_version":0,"max_protocol_version":0,"server_version":"2.4.4-mock"}"#,
        )
        .await;

        let first: Value = serde_json::from_str(&self.read_terminated().await).unwrap();
        assert_eq!(first["protocol_version"], 0);
        assert_eq!(first["authentication_method"], "SCRAM-SHA-256");
        let client_first = first["authentication"].as_str().unwrap().to_string();
        let client_first_bare = client_first.strip_prefix("n,,").unwrap().to_string();
        let client_nonce = client_first_bare.split_once(",r=").unwrap().1.to_string();

        let salt = b"mock-salt-0123";
        let iterations = 4096u32;
        let combined_nonce = format!("{}MockSrvNonce", client_nonce);
        let server_first = format!(
            "r={},s={},i={}",
            combined_nonce,
            BASE64.encode(salt),
            iterations
        );
        self.send_terminated(
            &serde_json::json!({"success": true, "authentication": server_first}).to_string(),
        )
        .await;

        let final_msg: Value = serde_json::from_str(&self.read_terminated().await).unwrap();
        let client_final = final_msg["authentication"].as_str().unwrap().to_string();
        let (without_proof, _proof) = client_final.split_once(",p=").unwrap();
        assert_eq!(without_proof, format!("c=biws,r={}", combined_nonce));

        let auth_message = format!("{},{},{}", client_first_bare, server_first, without_proof);
        let mut salted = [0u8; 32];
        pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, iterations, &mut salted).unwrap();
        let server_key = hmac256(&salted, b"Server Key");
        let signature = hmac256(&server_key, auth_message.as_bytes());
        self.send_terminated(
            &serde_json::json!({
                "success": true,
                "authentication": format!("v={}", BASE64.encode(signature)),
            })
            .to_string(),
        )
        .await;
    }

    /// Server side of the legacy V0_4 handshake. Returns the auth key the
    /// client offered.
    pub async fn handshake_v0_4(&mut self) -> Vec<u8> {
        assert_eq!(self.read_u32().await, V0_4_MAGIC);
        let key_len = self.read_u32().await as usize;
        let key = self.read_bytes(key_len).await;
        assert_eq!(self.read_u32().await, JSON_PROTOCOL_MAGIC);
        self.send_terminated("SUCCESS").await;
        key
    }

    /// Read one query frame: token plus parsed JSON payload.
    pub async fn read_query(&mut self) -> (u64, Value) {
        let mut header = [0u8; 12];
        self.stream.read_exact(&mut header).await.unwrap();
        let token = u64::from_le_bytes(header[0..8].try_into().unwrap());
        let len = u32::from_le_bytes(header[8..12].try_into().unwrap()) as usize;
        let payload = self.read_bytes(len).await;
        (token, serde_json::from_slice(&payload).unwrap())
    }

    /// Absorb whatever the client still sends and return once it hangs up.
    pub async fn wait_for_eof(mut self) {
        let mut buf = [0u8; 256];
        loop {
            match self.stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    }

    /// Write one response frame with a raw JSON body.
    pub async fn send_response(&mut self, token: u64, body: &str) {
        let mut frame = Vec::with_capacity(12 + body.len());
        frame.extend_from_slice(&token.to_le_bytes());
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(body.as_bytes());
        self.stream.get_mut().write_all(&frame).await.unwrap();
    }
}

fn hmac256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    mac.update(data);
    mac.finalize().into_bytes().into()
}
