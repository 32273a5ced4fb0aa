//! Outcome classification for guarded calls
//!
//! This module decides how an error returned by a guarded operation is
//! accounted for: as a failure (the default), as a success, or not at all.
//! Callers reclassify individual errors by wrapping them with
//! [`mark_successful`] or [`mark_ignorable`], or replace the predicates
//! wholesale through the builder.

use crate::Outcome;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Boxed error accepted by the reclassification markers
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Predicate over an error returned by a guarded operation
pub type ErrorPredicate = Arc<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>;

/// An error that the breaker should neither count as success nor as failure
#[derive(Debug, thiserror::Error)]
#[error("marked as an ignorable error: {inner}")]
pub struct IgnorableError {
    #[source]
    inner: BoxError,
}

impl IgnorableError {
    /// The wrapped error
    pub fn get_ref(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    /// Unwrap into the original error
    pub fn into_inner(self) -> BoxError {
        self.inner
    }
}

/// An error that the breaker should count as a successful call
///
/// Useful for errors that say nothing about the health of the dependency,
/// such as "not found" answers from an otherwise healthy service.
#[derive(Debug, thiserror::Error)]
#[error("marked as a successful error: {inner}")]
pub struct SuccessfulError {
    #[source]
    inner: BoxError,
}

impl SuccessfulError {
    /// The wrapped error
    pub fn get_ref(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    /// Unwrap into the original error
    pub fn into_inner(self) -> BoxError {
        self.inner
    }
}

/// Mark an error as ignorable for breaker bookkeeping
pub fn mark_ignorable(err: impl Into<BoxError>) -> IgnorableError {
    IgnorableError { inner: err.into() }
}

/// Mark an error as a success for breaker bookkeeping
pub fn mark_successful(err: impl Into<BoxError>) -> SuccessfulError {
    SuccessfulError { inner: err.into() }
}

/// Whether `err` or any error in its source chain is an `M`
fn chain_contains<M: Error + 'static>(err: &(dyn Error + 'static)) -> bool {
    std::iter::successors(Some(err), |e| (*e).source()).any(|e| e.is::<M>())
}

/// Default "is successful" predicate: the error carries a [`SuccessfulError`] marker
pub fn is_marked_successful(err: &(dyn Error + 'static)) -> bool {
    chain_contains::<SuccessfulError>(err)
}

/// Default "is ignorable" predicate: the error carries an [`IgnorableError`] marker
pub fn is_marked_ignorable(err: &(dyn Error + 'static)) -> bool {
    chain_contains::<IgnorableError>(err)
}

/// Maps the result of a guarded call onto an [`Outcome`]
///
/// Each predicate is either the marker-based default or a caller-supplied
/// override; an override replaces the default, it is not combined with it.
#[derive(Clone)]
pub struct Classifier {
    is_successful: Option<ErrorPredicate>,
    is_ignorable: Option<ErrorPredicate>,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            is_successful: None,
            is_ignorable: None,
        }
    }

    /// Replace the "is successful" predicate
    pub fn with_successful(mut self, predicate: ErrorPredicate) -> Self {
        self.is_successful = Some(predicate);
        self
    }

    /// Replace the "is ignorable" predicate
    pub fn with_ignorable(mut self, predicate: ErrorPredicate) -> Self {
        self.is_ignorable = Some(predicate);
        self
    }

    pub fn is_successful(&self, err: &(dyn Error + 'static)) -> bool {
        match &self.is_successful {
            Some(predicate) => predicate(err),
            None => is_marked_successful(err),
        }
    }

    pub fn is_ignorable(&self, err: &(dyn Error + 'static)) -> bool {
        match &self.is_ignorable {
            Some(predicate) => predicate(err),
            None => is_marked_ignorable(err),
        }
    }

    /// Classify an error returned by a guarded call
    ///
    /// Ignorable wins over successful when both predicates match.
    pub fn classify(&self, err: &(dyn Error + 'static)) -> Outcome {
        if self.is_ignorable(err) {
            Outcome::Ignored
        } else if self.is_successful(err) {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }

    /// Classify a whole call result; `Ok` is always a success
    pub fn classify_result<T, E>(&self, result: &Result<T, E>) -> Outcome
    where
        E: Error + 'static,
    {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => self.classify(e),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field(
                "is_successful",
                &self.is_successful.as_ref().map_or("<default>", |_| "<closure>"),
            )
            .field(
                "is_ignorable",
                &self.is_ignorable.as_ref().map_or("<default>", |_| "<closure>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Debug, thiserror::Error)]
    enum LookupError {
        #[error("backend unavailable")]
        Unavailable,
        #[error("lookup skipped")]
        Skipped(#[from] IgnorableError),
        #[error("lookup missed")]
        Missed(#[from] SuccessfulError),
    }

    #[test]
    fn test_default_classifier_counts_plain_errors_as_failures() {
        let classifier = Classifier::default();
        let err = io::Error::other("boom");

        assert_eq!(classifier.classify(&err), Outcome::Failure);
        assert_eq!(
            classifier.classify(&LookupError::Unavailable),
            Outcome::Failure
        );
    }

    #[test]
    fn test_ok_is_success() {
        let classifier = Classifier::default();
        let result: Result<u8, io::Error> = Ok(1);

        assert_eq!(classifier.classify_result(&result), Outcome::Success);
    }

    #[test]
    fn test_markers_are_recognised_at_top_level() {
        let classifier = Classifier::default();

        let ignored = mark_ignorable(io::Error::other("cancelled by caller"));
        let successful = mark_successful(io::Error::new(io::ErrorKind::NotFound, "404"));

        assert_eq!(classifier.classify(&ignored), Outcome::Ignored);
        assert_eq!(classifier.classify(&successful), Outcome::Success);
    }

    #[test]
    fn test_markers_are_recognised_in_source_chain() {
        let classifier = Classifier::default();

        let skipped = LookupError::from(mark_ignorable("stale cache key"));
        let missed = LookupError::from(mark_successful("no such row"));

        assert_eq!(classifier.classify(&skipped), Outcome::Ignored);
        assert_eq!(classifier.classify(&missed), Outcome::Success);
    }

    #[test]
    fn test_markers_preserve_original_error() {
        let marked = mark_successful(io::Error::new(io::ErrorKind::NotFound, "404"));

        assert_eq!(marked.to_string(), "marked as a successful error: 404");
        assert_eq!(marked.get_ref().to_string(), "404");
        assert_eq!(marked.source().map(|e| e.to_string()), Some("404".into()));

        let inner = marked.into_inner();
        let io_err = inner.downcast::<io::Error>().expect("io error");
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);

        let marked = mark_ignorable("shutting down");
        assert_eq!(
            marked.to_string(),
            "marked as an ignorable error: shutting down"
        );
    }

    #[test]
    fn test_ignorable_wins_over_successful() {
        let classifier = Classifier::default();
        let both = mark_successful(mark_ignorable("both"));

        assert_eq!(classifier.classify(&both), Outcome::Ignored);
    }

    #[test]
    fn test_override_replaces_default() {
        // Treat every NotFound as success; markers are no longer consulted
        let classifier = Classifier::new().with_successful(Arc::new(|err: &(dyn Error + 'static)| {
            err.downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
        }));

        let not_found = io::Error::new(io::ErrorKind::NotFound, "missing");
        assert_eq!(classifier.classify(&not_found), Outcome::Success);

        let marked = mark_successful("marker only");
        assert_eq!(classifier.classify(&marked), Outcome::Failure);

        // The ignorable default is untouched
        let ignored = mark_ignorable("still ignored");
        assert_eq!(classifier.classify(&ignored), Outcome::Ignored);
    }

    #[test]
    fn test_ignorable_override() {
        let classifier = Classifier::new().with_ignorable(Arc::new(|err: &(dyn Error + 'static)| {
            err.downcast_ref::<io::Error>()
                .is_some_and(|e| e.kind() == io::ErrorKind::Interrupted)
        }));

        let interrupted = io::Error::new(io::ErrorKind::Interrupted, "signal");
        assert_eq!(classifier.classify(&interrupted), Outcome::Ignored);
        assert_eq!(
            classifier.classify(&mark_ignorable("marker only")),
            Outcome::Failure
        );
    }
}
