//! Resilient execution: bounded retry of transient connectivity failures.
//!
//! A [`RetryPolicy`] wraps a single store operation. The operation's future is
//! awaited before the retry decision, so retries always apply to the resolved
//! outcome rather than to the act of starting the operation. Policies carry no
//! state across invocations and are safe to use from concurrent calls.

use std::future::Future;

use log::warn;

use crate::error::{RepositoryError, RepositoryResult};

/// Maximum total attempts per operation (the first attempt plus two retries).
pub const MAX_ATTEMPTS: u32 = 3;

/// Classifier deciding whether a failure qualifies for retry.
///
/// Decouples the retry mechanism from any single store client's error
/// hierarchy; backends map their native connectivity failures onto
/// [`RepositoryError::Connection`] and the default classifier picks those up.
pub type TransientClassifier = fn(&RepositoryError) -> bool;

/// A stateless, per-call retry policy: at most [`MAX_ATTEMPTS`] attempts, no
/// backoff, no jitter, retrying only failures the classifier marks transient.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    classifier: TransientClassifier,
}

impl RetryPolicy {
    /// Creates the default policy: retry transient connectivity failures, as
    /// classified by [`RepositoryError::is_transient`].
    pub fn transient() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            classifier: RepositoryError::is_transient,
        }
    }

    /// Creates a policy with a custom failure classifier.
    pub fn with_classifier(classifier: TransientClassifier) -> Self {
        Self { max_attempts: MAX_ATTEMPTS, classifier }
    }

    /// Executes `op`, retrying while it fails with a qualifying failure and
    /// attempts remain. The last attempt's outcome wins.
    ///
    /// # Errors
    ///
    /// Propagates the operation's failure unchanged: immediately for
    /// non-qualifying failures, after exhausting all attempts for transient
    /// ones.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> RepositoryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RepositoryResult<T>>,
    {
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && (self.classifier)(&err) => {
                    warn!(
                        "transient store failure on attempt {attempt}/{}: {err}",
                        self.max_attempts
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::transient()
    }
}
