use std::sync::Arc;

use crate::error::ClientError;

use super::Errors;

/// Uniform return shape of every network operation.
pub type Outcome<T> = Result<T, Errors>;

/// Conversions from an [`Outcome`] at the edges of the system.
pub trait OutcomeExt<T> {
    /// Collapse the error list to the failure that caused it.
    fn into_first(self) -> Result<T, Arc<ClientError>>;
}

impl<T> OutcomeExt<T> for Outcome<T> {
    fn into_first(self) -> Result<T, Arc<ClientError>> {
        self.map_err(|errors| errors.first().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_passes_through() {
        let outcome: Outcome<u32> = Ok(7);
        assert_eq!(outcome.into_first().unwrap(), 7);
    }

    #[test]
    fn err_yields_first_error() {
        let mut errors = Errors::single(ClientError::InvalidState("first".into()));
        errors.push(ClientError::InvalidState("second".into()));
        let outcome: Outcome<u32> = Err(errors);

        let err = outcome.into_first().unwrap_err();
        assert_eq!(err.to_string(), "invalid state: first");
    }
}
