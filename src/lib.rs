pub mod constant;
pub mod error;
mod opts;
pub mod protocol;
mod token;

pub use error::{Error, QueryErrorKind, Result};
pub use opts::Opts;
pub use protocol::datum::Datum;

#[cfg(feature = "tokio")]
pub mod tokio;

#[cfg(test)]
mod opts_test;
