pub mod datum;
pub mod frame;
pub mod handshake;
pub mod primitive;
pub mod response;
pub mod scram;

#[cfg(test)]
mod response_test;
