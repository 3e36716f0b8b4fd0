use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use flashtrans_types::{ErrorKind, Payload, RequestId, RequestKind, TargetLanguage};
use kanal::Sender;
use tokio_util::sync::CancellationToken;

use crate::request::Request;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pipeline is shut down")]
    Closed,
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::InvalidInput(_) => ErrorKind::InvalidInput,
            SubmitError::Closed => ErrorKind::Cancelled,
        }
    }
}

#[derive(Debug)]
struct SlotEntry {
    id: RequestId,
    cancel: CancellationToken,
}

/// Accepts requests, enforces one active request per kind, feeds the worker pool
pub struct Dispatcher {
    next_id: AtomicU64,
    slots: Mutex<HashMap<RequestKind, SlotEntry>>,
    jobs: Sender<Request>,
    target: TargetLanguage,
}

impl Dispatcher {
    pub(crate) fn new(jobs: Sender<Request>, target: TargetLanguage) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
            jobs,
            target,
        }
    }

    /// Validate `payload`, supersede the slot's current request and enqueue
    ///
    /// Never blocks on engine work; the superseded request is only flagged.
    pub fn submit(&self, kind: RequestKind, payload: Payload) -> Result<RequestId, SubmitError> {
        validate(kind, &payload)?;

        if self.jobs.is_closed() {
            return Err(SubmitError::Closed);
        }

        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();

        {
            let mut slots = self.slots();
            let previous = slots.insert(
                kind,
                SlotEntry {
                    id,
                    cancel: cancel.clone(),
                },
            );
            if let Some(previous) = previous {
                tracing::debug!("[DISPATCH] {} supersedes {} ({})", id, previous.id, kind);
                previous.cancel.cancel();
            }
        }

        tracing::debug!("[DISPATCH] {} accepted: {} {}", id, kind, payload.describe());

        let request = Request::new(id, kind, payload, self.target.clone(), cancel);
        if self.jobs.send(request).is_err() {
            self.retire(id, kind);
            return Err(SubmitError::Closed);
        }

        Ok(id)
    }

    /// Cancel the occupant of `kind` and vacate the slot
    pub fn cancel(&self, kind: RequestKind) -> Option<RequestId> {
        let entry = self.slots().remove(&kind)?;
        entry.cancel.cancel();
        tracing::debug!("[DISPATCH] {} cancelled ({})", entry.id, kind);
        Some(entry.id)
    }

    /// True while `id` is the current occupant of its slot
    pub fn is_active(&self, id: RequestId, kind: RequestKind) -> bool {
        self.slots().get(&kind).is_some_and(|entry| entry.id == id)
    }

    pub fn active(&self, kind: RequestKind) -> Option<RequestId> {
        self.slots().get(&kind).map(|entry| entry.id)
    }

    /// Vacate the slot after the request's terminal stage was applied
    ///
    /// No-op if the slot was already taken over by a newer request.
    pub fn retire(&self, id: RequestId, kind: RequestKind) -> bool {
        let mut slots = self.slots();
        if slots.get(&kind).is_some_and(|entry| entry.id == id) {
            slots.remove(&kind);
            true
        } else {
            false
        }
    }

    /// Cancel every occupant and close the job queue
    pub fn shutdown(&self) {
        for (kind, entry) in self.slots().drain() {
            tracing::debug!("[DISPATCH] {} cancelled on shutdown ({})", entry.id, kind);
            entry.cancel.cancel();
        }
        let _ = self.jobs.close();
    }

    pub fn is_closed(&self) -> bool {
        self.jobs.is_closed()
    }

    // Lock is never held across an await or a backend call
    fn slots(&self) -> MutexGuard<'_, HashMap<RequestKind, SlotEntry>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate(kind: RequestKind, payload: &Payload) -> Result<(), SubmitError> {
    match (kind, payload) {
        (
            RequestKind::SelectionTranslate
            | RequestKind::TypedTranslate
            | RequestKind::DashboardRetranslate,
            Payload::Text(text),
        ) => {
            if text.trim().is_empty() {
                return Err(SubmitError::InvalidInput("empty text".to_string()));
            }
        }
        (RequestKind::RegionOcrTranslate, Payload::Image(image)) => {
            if !image.is_valid() {
                return Err(SubmitError::InvalidInput(format!(
                    "image {}x{} with {} bytes",
                    image.width,
                    image.height,
                    image.pixels.len()
                )));
            }
        }
        (RequestKind::Chat, Payload::Chat(prompt)) => {
            if prompt.question.trim().is_empty() {
                return Err(SubmitError::InvalidInput("empty question".to_string()));
            }
        }
        (kind, payload) => {
            return Err(SubmitError::InvalidInput(format!(
                "{} cannot take {}",
                kind,
                payload.describe()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use flashtrans_types::{CapturedImage, ChatPrompt};

    use super::*;

    fn dispatcher() -> (Dispatcher, kanal::Receiver<Request>) {
        let (tx, rx) = kanal::unbounded();
        (Dispatcher::new(tx, TargetLanguage::Auto), rx)
    }

    #[test]
    fn test_submit_enqueues_request() {
        let (dispatcher, rx) = dispatcher();
        let id = dispatcher
            .submit(RequestKind::TypedTranslate, Payload::text("hello"))
            .unwrap();

        let request = rx.try_recv().unwrap().unwrap();
        assert_eq!(request.id, id);
        assert_eq!(request.kind, RequestKind::TypedTranslate);
        assert!(!request.is_cancelled());
        assert!(dispatcher.is_active(id, RequestKind::TypedTranslate));
    }

    #[test]
    fn test_same_kind_supersedes() {
        let (dispatcher, rx) = dispatcher();
        let first = dispatcher
            .submit(RequestKind::SelectionTranslate, Payload::text("one"))
            .unwrap();
        let second = dispatcher
            .submit(RequestKind::SelectionTranslate, Payload::text("two"))
            .unwrap();

        assert!(second > first);
        let first_request = rx.try_recv().unwrap().unwrap();
        let second_request = rx.try_recv().unwrap().unwrap();
        assert!(first_request.is_cancelled());
        assert!(!second_request.is_cancelled());
        assert!(!dispatcher.is_active(first, RequestKind::SelectionTranslate));
        assert!(dispatcher.is_active(second, RequestKind::SelectionTranslate));
    }

    #[test]
    fn test_kinds_have_independent_slots() {
        let (dispatcher, rx) = dispatcher();
        let typed = dispatcher
            .submit(RequestKind::TypedTranslate, Payload::text("a"))
            .unwrap();
        let selection = dispatcher
            .submit(RequestKind::SelectionTranslate, Payload::text("b"))
            .unwrap();

        assert!(dispatcher.is_active(typed, RequestKind::TypedTranslate));
        assert!(dispatcher.is_active(selection, RequestKind::SelectionTranslate));
        assert!(!rx.try_recv().unwrap().unwrap().is_cancelled());
    }

    #[test]
    fn test_invalid_input_creates_nothing() {
        let (dispatcher, rx) = dispatcher();

        let blank = dispatcher.submit(RequestKind::TypedTranslate, Payload::text("  \n"));
        assert!(matches!(blank, Err(SubmitError::InvalidInput(_))));

        let short = CapturedImage::new(2, 2, vec![0; 15]);
        let image = dispatcher.submit(RequestKind::RegionOcrTranslate, Payload::Image(short));
        assert!(matches!(image, Err(SubmitError::InvalidInput(_))));

        let empty = CapturedImage::new(0, 4, vec![]);
        assert!(dispatcher
            .submit(RequestKind::RegionOcrTranslate, Payload::Image(empty))
            .is_err());

        let question = dispatcher.submit(RequestKind::Chat, Payload::Chat(ChatPrompt::new(" ")));
        assert_eq!(question.unwrap_err().kind(), ErrorKind::InvalidInput);

        let mismatch = dispatcher.submit(RequestKind::Chat, Payload::text("hi"));
        assert!(matches!(mismatch, Err(SubmitError::InvalidInput(_))));

        assert!(rx.try_recv().unwrap().is_none());
        assert!(dispatcher.active(RequestKind::TypedTranslate).is_none());
    }

    #[test]
    fn test_invalid_submit_keeps_previous_occupant() {
        let (dispatcher, rx) = dispatcher();
        let id = dispatcher
            .submit(RequestKind::TypedTranslate, Payload::text("keep"))
            .unwrap();
        assert!(dispatcher
            .submit(RequestKind::TypedTranslate, Payload::text(""))
            .is_err());

        assert!(dispatcher.is_active(id, RequestKind::TypedTranslate));
        assert!(!rx.try_recv().unwrap().unwrap().is_cancelled());
    }

    #[test]
    fn test_cancel_vacates_slot() {
        let (dispatcher, rx) = dispatcher();
        let id = dispatcher
            .submit(RequestKind::Chat, Payload::Chat(ChatPrompt::new("hi")))
            .unwrap();

        assert_eq!(dispatcher.cancel(RequestKind::Chat), Some(id));
        assert_eq!(dispatcher.cancel(RequestKind::Chat), None);
        assert!(rx.try_recv().unwrap().unwrap().is_cancelled());
    }

    #[test]
    fn test_retire_only_matching_occupant() {
        let (dispatcher, _rx) = dispatcher();
        let first = dispatcher
            .submit(RequestKind::TypedTranslate, Payload::text("a"))
            .unwrap();
        let second = dispatcher
            .submit(RequestKind::TypedTranslate, Payload::text("b"))
            .unwrap();

        assert!(!dispatcher.retire(first, RequestKind::TypedTranslate));
        assert!(dispatcher.is_active(second, RequestKind::TypedTranslate));
        assert!(dispatcher.retire(second, RequestKind::TypedTranslate));
        assert!(dispatcher.active(RequestKind::TypedTranslate).is_none());
    }

    #[test]
    fn test_shutdown_rejects_submits() {
        let (dispatcher, _rx) = dispatcher();
        let id = dispatcher
            .submit(RequestKind::TypedTranslate, Payload::text("a"))
            .unwrap();

        dispatcher.shutdown();
        assert!(dispatcher.is_closed());
        assert!(!dispatcher.is_active(id, RequestKind::TypedTranslate));
        assert!(matches!(
            dispatcher.submit(RequestKind::TypedTranslate, Payload::text("b")),
            Err(SubmitError::Closed)
        ));
    }
}
