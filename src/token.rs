use std::sync::atomic::{AtomicU64, Ordering};

use crate::constant::TOKEN_SEED;
use crate::error::{Error, Result};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(TOKEN_SEED);

/// Allocate the next query token.
///
/// Tokens are process-global and monotonically increasing, so no token is
/// ever reused for two queries in the lifetime of the process, even across
/// connections. Wrapping would take ~580 years at a billion queries per
/// second; if it is ever observed we refuse to recycle.
pub fn next_token() -> Result<u64> {
    let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    if token == u64::MAX {
        return Err(Error::Bug("query token space exhausted".to_string()));
    }
    Ok(token)
}
