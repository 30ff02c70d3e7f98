//! Failure taxonomy for batch execution.

use std::fmt;

use thiserror::Error;

/// The outcome of a single work item that did not succeed.
#[derive(Debug, Error)]
pub enum WorkError {
    /// The item returned an error of its own.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// The item panicked; the payload was captured at the runner boundary
    /// and rendered as a message.
    #[error("work item panicked: {0}")]
    Panicked(String),
}

impl WorkError {
    /// Whether this failure is a recovered panic rather than an error the
    /// item returned on purpose.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// One or more work item failures from a single batch, in the order the
/// items were supplied.
///
/// Completion order of a parallel batch is nondeterministic, but the
/// aggregate always reads back in input order.
#[derive(Debug)]
pub struct BatchError {
    failures: Vec<WorkError>,
}

impl BatchError {
    /// Builds an aggregate from per-item failures already in input order.
    /// Returns `None` when there is nothing to report.
    pub(crate) fn from_failures(failures: Vec<WorkError>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    /// The individual failures, in input order.
    pub fn failures(&self) -> &[WorkError] {
        &self.failures
    }

    /// Number of failed items in the batch.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl From<WorkError> for BatchError {
    fn from(failure: WorkError) -> Self {
        Self {
            failures: vec![failure],
        }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_failure_list_is_no_error() {
        assert!(BatchError::from_failures(Vec::new()).is_none());
    }

    #[test]
    fn display_joins_failures_with_newlines() {
        let Some(err) = BatchError::from_failures(vec![
            WorkError::Failed(anyhow!("disk full")),
            WorkError::Panicked("index out of bounds".to_string()),
        ]) else {
            panic!("two failures must aggregate");
        };

        assert_eq!(
            err.to_string(),
            "disk full\nwork item panicked: index out of bounds"
        );
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn single_failure_converts_to_batch() {
        let err = BatchError::from(WorkError::Failed(anyhow!("boom")));
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.failures().len(), 1);
    }

    #[test]
    fn panic_failures_are_tagged() {
        let fault = WorkError::Panicked("oh no".to_string());
        assert!(fault.is_panic());
        assert!(!WorkError::Failed(anyhow!("plain")).is_panic());
    }
}
