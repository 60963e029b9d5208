use std::{sync::Arc, time::Duration};

use crate::CellId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cell '{id}' cannot initialize: {source}")]
    CellInit {
        id: CellId,
        #[source]
        source: Box<Error>,
    },

    #[error("Cell with id '{0}' already exists.")]
    DuplicateId(CellId),

    #[error("Cell with id '{0}' does not exist.")]
    InvalidId(CellId),

    #[error("Event has no topic.")]
    NoTopic,

    #[error("Cannot respond, event is no request.")]
    NoRequest,

    #[error("Error during payload encoding: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("Error during payload decoding of '{key}': {source}")]
    Decoding {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Payload has no value for key '{0}'.")]
    MissingValue(String),

    #[error("{0} is stopping.")]
    Stopping(&'static str),

    #[error("Request '{topic}' to cell '{id}' needed longer than {timeout:?}.")]
    Timeout {
        id: CellId,
        topic: Arc<str>,
        timeout: Duration,
    },

    #[error("Cell '{id}' recovered too often, last fault: {reason}")]
    RecoveredTooOften { id: CellId, reason: String },

    #[error("Cell '{id}' cannot recover after fault '{reason}': {source}")]
    EventRecovering {
        id: CellId,
        reason: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Behavior of cell '{id}' cannot recover: {reason}")]
    CannotRecover { id: CellId, reason: String },

    #[error("Event could not be delivered to {0:?}.")]
    Undelivered(Vec<CellId>),

    #[error("Error external to the cell network occurred: {0}")]
    External(Arc<str>),
}

impl Error {
    /// Wraps a behavior-defined failure message.
    pub fn external<S: Into<Arc<str>>>(message: S) -> Self {
        Error::External(message.into())
    }

    pub fn is_cell_init(&self) -> bool {
        matches!(self, Error::CellInit { .. })
    }

    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, Error::DuplicateId(_))
    }

    pub fn is_invalid_id(&self) -> bool {
        matches!(self, Error::InvalidId(_))
    }

    pub fn is_no_topic(&self) -> bool {
        matches!(self, Error::NoTopic)
    }

    pub fn is_no_request(&self) -> bool {
        matches!(self, Error::NoRequest)
    }

    pub fn is_stopping(&self) -> bool {
        matches!(self, Error::Stopping(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub fn is_recovered_too_often(&self) -> bool {
        matches!(self, Error::RecoveredTooOften { .. })
    }

    pub fn is_event_recovering(&self) -> bool {
        matches!(self, Error::EventRecovering { .. })
    }

    pub fn is_cannot_recover(&self) -> bool {
        matches!(self, Error::CannotRecover { .. })
    }

    pub fn is_undelivered(&self) -> bool {
        matches!(self, Error::Undelivered(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_init_keeps_source() {
        let err = Error::CellInit {
            id: CellId::from("foo"),
            source: Box::new(Error::external("no database")),
        };
        assert_eq!(
            err.to_string(),
            "Cell 'foo' cannot initialize: Error external to the cell network occurred: no database"
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.is_cell_init());
        assert!(!err.is_undelivered());
    }

    #[test]
    fn test_supervision_and_delivery_predicates() {
        let err = Error::CannotRecover {
            id: CellId::from("foo"),
            reason: "panic: Ouch!".to_string(),
        };
        assert!(err.is_cannot_recover());
        assert!(!err.is_event_recovering());

        let err = Error::Undelivered(vec![CellId::from("b")]);
        assert!(err.is_undelivered());
        assert!(!err.is_cell_init());
    }

    #[test]
    fn test_timeout_message_names_destination() {
        let err = Error::Timeout {
            id: CellId::from("collector"),
            topic: Arc::from("processed?"),
            timeout: Duration::from_millis(50),
        };
        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("collector"));
        assert!(msg.contains("processed?"));
    }
}
