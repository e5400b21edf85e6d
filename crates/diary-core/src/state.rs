//! Request envelope shared by every fetch/write outcome.

use crate::error::{Error, Result};

/// Lifecycle of an asynchronous fetch or write.
///
/// This is a tag, not a state machine: nothing enforces the order in which a
/// holder moves between variants. Repository calls only ever resolve to
/// `Success` or `Error`; `Idle` and `Loading` exist for callers that keep the
/// envelope as observable state before and during a call.
#[derive(Debug, Default)]
pub enum RequestState<T> {
    #[default]
    Idle,
    Loading,
    Success(T),
    Error(Error),
}

impl<T> RequestState<T> {
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Borrow the payload of a `Success`.
    pub const fn success(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Borrow the cause of an `Error`.
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestState<U> {
        match self {
            Self::Idle => RequestState::Idle,
            Self::Loading => RequestState::Loading,
            Self::Success(data) => RequestState::Success(f(data)),
            Self::Error(error) => RequestState::Error(error),
        }
    }

    /// Collapse back into a `Result`.
    ///
    /// `Idle` and `Loading` carry no outcome yet and yield `None`.
    pub fn into_result(self) -> Option<Result<T>> {
        match self {
            Self::Idle | Self::Loading => None,
            Self::Success(data) => Some(Ok(data)),
            Self::Error(error) => Some(Err(error)),
        }
    }
}

impl<T> From<Result<T>> for RequestState<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(error) => Self::Error(error),
        }
    }
}
