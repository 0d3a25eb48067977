//! Outcome type for query-style registry operations.

use crate::error::{RegistryError, RegistryResult};

/// The outcome of a query that degrades instead of failing.
///
/// Query-style operations log lookup failures and carry on. `QueryOutcome`
/// keeps the three cases apart so callers can tell "nothing there" from
/// "could not look".
///
/// ```
/// use appmig_registry::types::QueryOutcome;
///
/// let found = QueryOutcome::from_items(vec![1, 2]);
/// assert!(found.is_found());
///
/// let empty: QueryOutcome<Vec<i32>> = QueryOutcome::from_items(vec![]);
/// assert!(empty.is_empty());
/// assert!(empty.into_items().is_empty());
/// ```
#[derive(Debug)]
pub enum QueryOutcome<T> {
    /// The query produced a result.
    Found(T),
    /// The query succeeded but there is nothing to return.
    Empty,
    /// The query could not be answered. The error has already been logged.
    Failed(RegistryError),
}

impl<T> QueryOutcome<T> {
    /// Returns `true` if a result was found.
    pub fn is_found(&self) -> bool {
        matches!(self, QueryOutcome::Found(_))
    }

    /// Returns `true` if the query succeeded with nothing to return.
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryOutcome::Empty)
    }

    /// Returns `true` if the query failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, QueryOutcome::Failed(_))
    }

    /// Returns the failure, if any.
    pub fn error(&self) -> Option<&RegistryError> {
        match self {
            QueryOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the found value, discarding the distinction between empty and failed.
    pub fn found(self) -> Option<T> {
        match self {
            QueryOutcome::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Converts back into a fallible result.
    pub fn into_result(self) -> RegistryResult<Option<T>> {
        match self {
            QueryOutcome::Found(value) => Ok(Some(value)),
            QueryOutcome::Empty => Ok(None),
            QueryOutcome::Failed(err) => Err(err),
        }
    }
}

impl<T> QueryOutcome<Vec<T>> {
    /// Wraps a list, mapping an empty list to [`QueryOutcome::Empty`].
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            QueryOutcome::Empty
        } else {
            QueryOutcome::Found(items)
        }
    }

    /// Returns the items as a slice; empty unless found.
    pub fn items(&self) -> &[T] {
        match self {
            QueryOutcome::Found(items) => items,
            _ => &[],
        }
    }

    /// Returns the items; empty unless found.
    pub fn into_items(self) -> Vec<T> {
        self.found().unwrap_or_default()
    }
}
