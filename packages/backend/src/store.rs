//! The store adapter contract.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Backend errors.
///
/// Connectivity failures are surfaced as-is; nothing in this crate retries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Command error: {0}")]
    Command(String),
    #[error("Invalid backend config: {0}")]
    InvalidConfig(String),
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Atomic list, set and key/value operations over a shared backend.
///
/// Every call is atomic on its own. Keys are passed without the namespace
/// prefix; implementations apply it. The only exception is the list key
/// returned by [`Store::blocking_pop_left`], which is reported exactly as the
/// backend names it, prefix included.
pub trait Store: Send + Sync + 'static {
    /// The key prefix applied to every key, without the trailing `:`.
    fn namespace(&self) -> &str;

    /// Add a member to a set. Returns true if it was not already present.
    fn add_to_set(
        &self,
        set: &str,
        member: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Remove a member from a set. Returns true if it was present.
    fn remove_from_set(
        &self,
        set: &str,
        member: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Every member of a set, empty if the set does not exist.
    fn members(&self, set: &str) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Append to the tail of a list, returning the new length.
    fn push_right(
        &self,
        list: &str,
        value: &str,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Remove and return the head of a list.
    fn pop_left(&self, list: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Remove and return the tail of a list.
    fn pop_right(&self, list: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Number of items in a list, zero if it does not exist.
    fn length(&self, list: &str) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Element at `index`; negative indices count from the tail.
    fn index_at(
        &self,
        list: &str,
        index: i64,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Elements from `start` to `end` inclusive; negative indices count from the tail.
    fn range(
        &self,
        list: &str,
        start: i64,
        end: i64,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Pop the head of the first non-empty list, waiting up to `timeout` for
    /// one to receive an item. A zero timeout waits indefinitely.
    ///
    /// Returns the namespaced key of the list that produced the item.
    fn blocking_pop_left(
        &self,
        lists: &[String],
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<(String, String)>, StoreError>> + Send;

    /// Atomically pop the tail of `source` and push it onto the head of `dest`.
    fn move_right_to_left(
        &self,
        source: &str,
        dest: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Store a string value, replacing a key of any type.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read a string value.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Delete a key of any type. Returns true if something was removed.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Add `by` to an integer counter, creating it at zero, and return the new value.
    fn increment(&self, key: &str, by: i64) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Drop the live connection. The next command reconnects.
    fn disconnect(&self);
}

/// Resolve a list index the way the backend does: negative counts from the tail.
pub(crate) fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

/// Resolve an inclusive range into a half-open one, clamped to the list.
pub(crate) fn resolve_range(start: i64, end: i64, len: usize) -> Option<std::ops::Range<usize>> {
    let len_i = len as i64;
    let start = if start < 0 { (len_i + start).max(0) } else { start };
    let end = if end < 0 { len_i + end } else { end.min(len_i - 1) };
    (start <= end && start < len_i).then(|| start as usize..end as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_count_from_either_end() {
        assert_eq!(resolve_index(0, 3), Some(0));
        assert_eq!(resolve_index(-1, 3), Some(2));
        assert_eq!(resolve_index(3, 3), None);
        assert_eq!(resolve_index(-4, 3), None);
    }

    #[test]
    fn ranges_are_inclusive_and_clamped() {
        assert_eq!(resolve_range(0, -1, 3), Some(0..3));
        assert_eq!(resolve_range(1, 10, 3), Some(1..3));
        assert_eq!(resolve_range(-2, -1, 3), Some(1..3));
        assert_eq!(resolve_range(-10, 0, 3), Some(0..1));
        assert_eq!(resolve_range(2, 1, 3), None);
        assert_eq!(resolve_range(0, -1, 0), None);
        assert_eq!(resolve_range(5, 6, 3), None);
    }
}
