use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("submit on a closed pipeline")]
    SubmitAfterClose,
    #[error("pipeline poisoned by an earlier worker failure")]
    Poisoned,
    #[error("worker failed: {0}")]
    Worker(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// Push rejected because the queue is closed. Hands the item back to the
// caller so nothing is silently dropped.
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PushError(..)")
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("push on a closed queue")
    }
}

impl<T> std::error::Error for PushError<T> {}
