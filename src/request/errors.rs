use std::{fmt, slice, sync::Arc};

use crate::{
    dao::storage::StorageError,
    error::{ApiError, ClientError},
};

/// Non-empty list of failures carried by a failed outcome or request.
///
/// Errors are reference counted so an outcome can be shared between every
/// party awaiting the same in-flight request.
#[derive(Debug, Clone)]
pub struct Errors {
    inner: Vec<Arc<ClientError>>,
}

impl Errors {
    /// Wrap a single failure.
    pub fn single(err: impl Into<ClientError>) -> Self {
        Self {
            inner: vec![Arc::new(err.into())],
        }
    }

    /// Build from an already shared failure and any follow-ups.
    pub fn new(first: Arc<ClientError>, rest: impl IntoIterator<Item = Arc<ClientError>>) -> Self {
        let mut inner = vec![first];
        inner.extend(rest);
        Self { inner }
    }

    /// The failure that caused the outcome; always present.
    pub fn first(&self) -> &Arc<ClientError> {
        &self.inner[0]
    }

    /// Every failure, in the order it was recorded.
    pub fn iter(&self) -> slice::Iter<'_, Arc<ClientError>> {
        self.inner.iter()
    }

    /// Number of recorded failures, at least one.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Always `false`; a failure carries at least one error.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append another failure.
    pub fn push(&mut self, err: impl Into<ClientError>) {
        self.inner.push(Arc::new(err.into()));
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for err in &self.inner {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl From<ClientError> for Errors {
    fn from(err: ClientError) -> Self {
        Errors::single(err)
    }
}

impl From<ApiError> for Errors {
    fn from(err: ApiError) -> Self {
        Errors::single(err)
    }
}

impl From<StorageError> for Errors {
    fn from(err: StorageError) -> Self {
        Errors::single(err)
    }
}

impl From<Arc<ClientError>> for Errors {
    fn from(err: Arc<ClientError>) -> Self {
        Errors::new(err, [])
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Arc<ClientError>;
    type IntoIter = slice::Iter<'a, Arc<ClientError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
