use crate::parameters::ParameterError;

/// Errors raised when a caller violates a documented precondition.
///
/// These are never transient: retrying with the same arguments fails again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Parameters(#[from] ParameterError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns early with [`Error::InvalidArgument`] unless `cond` holds.
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            let message = format!($($arg)+);
            #[cfg(feature = "tracing")]
            tracing::debug!(%message, "rejected argument");
            return Err($crate::errors::Error::InvalidArgument(message));
        }
    };
}

pub(crate) use ensure;
