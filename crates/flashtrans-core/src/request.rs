use std::time::{Duration, Instant};

use flashtrans_types::{Payload, RequestId, RequestKind, TargetLanguage};
use tokio_util::sync::CancellationToken;

/// One unit of work, immutable apart from its cancel flag
#[derive(Debug)]
pub struct Request {
    pub id: RequestId,
    pub kind: RequestKind,
    pub payload: Payload,
    pub target: TargetLanguage,
    pub created_at: Instant,
    cancel: CancellationToken,
}

impl Request {
    pub(crate) fn new(
        id: RequestId,
        kind: RequestKind,
        payload: Payload,
        target: TargetLanguage,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            kind,
            payload,
            target,
            created_at: Instant::now(),
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}
