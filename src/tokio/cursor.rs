use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::constant::QueryType;
use crate::error::{Error, Result};

use super::conn::{PendingResponse, Shared, control_payload};

/// Continuation handle for a partial sequence.
///
/// Delivered inside [`Response::Rows`](super::Response::Rows) when the
/// server holds more batches behind the query's token. The handle fires
/// at most once: [`Cursor::next_batch`] requests the next batch, whose
/// response carries a fresh cursor if the stream still has more.
pub struct Cursor {
    shared: Arc<Shared>,
    token: u64,
    consumed: AtomicBool,
}

impl Cursor {
    pub(crate) fn new(shared: Arc<Shared>, token: u64) -> Self {
        Self {
            shared,
            token,
            consumed: AtomicBool::new(false),
        }
    }

    /// The query token this cursor continues.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Request the next batch of the sequence.
    ///
    /// Fails with [`Error::ContinuationMisused`] when invoked a second
    /// time; the batch it fetched carries the cursor for the batch after.
    pub async fn next_batch(&self) -> Result<PendingResponse> {
        if self.consumed.swap(true, Ordering::AcqRel) {
            return Err(Error::ContinuationMisused);
        }
        self.shared
            .send_with_waiter(self.token, &control_payload(QueryType::Continue))
            .await
    }

    /// Tell the server to drop the stream early.
    ///
    /// The server acknowledges with one terminal response for this token;
    /// with no waiter registered it is discarded by the read loop.
    pub async fn stop(&self) -> Result<()> {
        self.consumed.store(true, Ordering::Release);
        self.shared
            .send_fire_and_forget(self.token, &control_payload(QueryType::Stop))
            .await
    }
}

impl core::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cursor")
            .field("token", &self.token)
            .field("consumed", &self.consumed.load(Ordering::Relaxed))
            .finish()
    }
}
