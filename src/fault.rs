use std::{any::Any, fmt};

use crate::Error;

/// Reason a processing step of a cell went wrong.
///
/// Passed to [`Behavior::recover`](crate::Behavior::recover). A failed step
/// returned an error, a panicked step was caught by the cell loop.
#[derive(Debug)]
pub enum Fault {
    Failed(Error),
    Panicked(String),
}

impl Fault {
    pub(crate) fn from_panic(panic: Box<dyn Any + Send>) -> Self {
        let message = match panic.downcast::<String>() {
            Ok(message) => *message,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "unknown panic".to_string(),
            },
        };
        Fault::Panicked(message)
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Fault::Panicked(_))
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Failed(err) => write!(f, "{err}"),
            Fault::Panicked(message) => write!(f, "panic: {message}"),
        }
    }
}
