use std::sync::Arc;
use thiserror::Error;

/// Why a slot did not produce a value.
///
/// Reported through the slot's own [`ResultHandle`](crate::ResultHandle) only; it never aborts
/// delivery to the other slots of the same invocation. Cloneable because every clone of a result
/// handle observes the same outcome.
#[derive(Error, Debug, Clone)]
pub enum SlotError {
    /// The slot panicked while running. Carries the panic message when it was a string.
    ///
    /// Panics are only caught when the final binary unwinds. With `panic = "abort"` a panicking
    /// slot ends the process instead.
    #[error("slot panicked: {0}")]
    Panicked(String),
    /// The unit of work for the slot could not be started.
    #[error("failed to launch slot: {0}")]
    Launch(Arc<std::io::Error>),
    /// The unit of work was dropped before it ran, e.g. because its runtime shut down.
    #[error("slot was abandoned before it produced a result")]
    Abandoned,
}

impl From<std::io::Error> for SlotError {
    fn from(e: std::io::Error) -> Self { SlotError::Launch(Arc::new(e)) }
}

impl SlotError {
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => message.to_string(),
                Err(_) => "<non-string panic payload>".to_string(),
            },
        };
        SlotError::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_message() {
        let err = std::panic::catch_unwind(|| panic!("boom {}", 42)).unwrap_err();
        assert!(matches!(SlotError::from_panic(err), SlotError::Panicked(m) if m == "boom 42"));

        let err = std::panic::catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
        assert!(matches!(SlotError::from_panic(err), SlotError::Panicked(m) if m == "<non-string panic payload>"));
    }

    #[test]
    fn test_launch_error_display() {
        let err: SlotError = std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no threads left").into();
        assert_eq!(err.to_string(), "failed to launch slot: no threads left");
    }
}
