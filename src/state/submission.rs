use std::future::Future;

use crate::{
    dao::models::EntryReceipt,
    dto::validation::is_submittable,
    request::{AsyncRequest, Errors, Outcome},
};

/// Lifecycle of the current user's entry for the active round.
#[derive(Debug, Clone)]
pub enum RoundSubmission {
    /// Text being edited, not yet sent.
    NotSubmitted { value: String },
    /// Entry sent (or already on record server-side).
    Submitted {
        submission: AsyncRequest<EntryReceipt>,
    },
}

impl RoundSubmission {
    pub fn empty(value: Option<String>) -> Self {
        RoundSubmission::NotSubmitted {
            value: value.unwrap_or_default(),
        }
    }

    pub fn pending<Fut>(operation: Fut) -> Self
    where
        Fut: Future<Output = Outcome<EntryReceipt>> + Send + 'static,
    {
        RoundSubmission::Submitted {
            submission: AsyncRequest::loading(operation),
        }
    }

    pub fn done(entry: impl Into<String>) -> Self {
        RoundSubmission::Submitted {
            submission: AsyncRequest::Loaded(EntryReceipt {
                entry: entry.into(),
            }),
        }
    }

    pub fn failed(errors: Errors) -> Self {
        RoundSubmission::Submitted {
            submission: AsyncRequest::Failed(errors),
        }
    }

    /// Fold a settled outcome back into the submission.
    pub fn settled(outcome: Outcome<EntryReceipt>) -> Self {
        match outcome {
            Ok(receipt) => Self::done(receipt.entry),
            Err(errors) => Self::failed(errors),
        }
    }

    /// Whether the submit action is enabled.
    ///
    /// Editing is never blocked; only sending is gated on the text length.
    pub fn can_submit(&self) -> bool {
        match self {
            RoundSubmission::NotSubmitted { value } => is_submittable(value),
            RoundSubmission::Submitted { .. } => false,
        }
    }

    /// Whether a new attempt may replace this submission.
    pub fn can_retry(&self) -> bool {
        matches!(
            self,
            RoundSubmission::Submitted {
                submission: AsyncRequest::Failed(_)
            }
        )
    }

    /// Accepted entry text, once the server acknowledged it.
    pub fn entry(&self) -> Option<&str> {
        match self {
            RoundSubmission::Submitted {
                submission: AsyncRequest::Loaded(receipt),
            } => Some(&receipt.entry),
            _ => None,
        }
    }
}

impl Default for RoundSubmission {
    fn default() -> Self {
        Self::empty(None)
    }
}
