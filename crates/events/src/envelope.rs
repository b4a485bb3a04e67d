use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tillbook_core::{RegisterId, SessionId};

/// Envelope for an applied event, with register + revision metadata.
///
/// Services hand these back to callers after a snapshot was saved, so a screen
/// can show what just happened without re-reading the store.
///
/// - `revision` is the register revision reached by applying this event.
/// - `session_id` is `None` for events that did not belong to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    register_id: RegisterId,
    session_id: Option<SessionId>,
    revision: u64,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        register_id: RegisterId,
        session_id: Option<SessionId>,
        revision: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            register_id,
            session_id,
            revision,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn register_id(&self) -> RegisterId {
        self.register_id
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
