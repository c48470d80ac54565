//! Process-wide record of alerted fingerprints and per-service error counters.

use std::collections::{BTreeMap, HashSet};

use tokio::sync::Mutex;

use crate::types::{DedupSnapshot, Fingerprint};

#[derive(Debug, Default)]
struct Inner {
  seen: HashSet<Fingerprint>,
  counts: BTreeMap<String, u64>,
}

/// Seen-fingerprint set plus error counters, shared by every scan cycle.
///
/// All operations take the same lock, so a test-and-insert can never be split
/// between two concurrent cycles.
#[derive(Debug, Default)]
pub struct DedupStore {
  inner: Mutex<Inner>,
}

impl DedupStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert `fp` if it is unknown and attribute it to `service`.
  ///
  /// Returns true when the fingerprint was new (and the counter was bumped).
  pub async fn record_if_new(&self, fp: Fingerprint, service: &str) -> bool {
    let mut inner = self.inner.lock().await;
    if !inner.seen.insert(fp) {
      return false;
    }
    *inner.counts.entry(service.to_string()).or_insert(0) += 1;
    true
  }

  pub async fn is_new(&self, fp: &Fingerprint) -> bool {
    !self.inner.lock().await.seen.contains(fp)
  }

  /// Forget every fingerprint and counter; returns how many fingerprints were dropped.
  pub async fn clear(&self) -> usize {
    let mut inner = self.inner.lock().await;
    let cleared = inner.seen.len();
    inner.seen.clear();
    inner.counts.clear();
    cleared
  }

  pub async fn snapshot(&self) -> DedupSnapshot {
    let inner = self.inner.lock().await;
    DedupSnapshot {
      errors_tracked: inner.seen.len(),
      error_counts: inner.counts.clone(),
    }
  }

  pub async fn count_for(&self, service: &str) -> u64 {
    self
      .inner
      .lock()
      .await
      .counts
      .get(service)
      .copied()
      .unwrap_or(0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fingerprint;
  use std::sync::Arc;

  #[tokio::test]
  async fn first_record_is_new_second_is_not() {
    let store = DedupStore::new();
    let fp = fingerprint::compute("api", "boom");
    assert!(store.is_new(&fp).await);
    assert!(store.record_if_new(fp.clone(), "api").await);
    assert!(!store.is_new(&fp).await);
    assert!(!store.record_if_new(fp, "api").await);
    assert_eq!(store.count_for("api").await, 1);
  }

  #[tokio::test]
  async fn counts_are_per_service() {
    let store = DedupStore::new();
    store.record_if_new(fingerprint::compute("api", "a"), "api").await;
    store.record_if_new(fingerprint::compute("api", "b"), "api").await;
    store.record_if_new(fingerprint::compute("worker", "a"), "worker").await;

    let snap = store.snapshot().await;
    assert_eq!(snap.errors_tracked, 3);
    assert_eq!(snap.error_counts.get("api"), Some(&2));
    assert_eq!(snap.error_counts.get("worker"), Some(&1));
  }

  #[tokio::test]
  async fn clear_reports_prior_size_and_resets() {
    let store = DedupStore::new();
    let fp = fingerprint::compute("api", "boom");
    store.record_if_new(fp.clone(), "api").await;
    store.record_if_new(fingerprint::compute("api", "other"), "api").await;

    assert_eq!(store.clear().await, 2);
    let snap = store.snapshot().await;
    assert_eq!(snap.errors_tracked, 0);
    assert!(snap.error_counts.is_empty());
    assert_eq!(store.count_for("api").await, 0);
    assert!(store.record_if_new(fp, "api").await);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_inserts_count_once() {
    let store = Arc::new(DedupStore::new());
    let fp = fingerprint::compute("api", "boom");

    let mut handles = Vec::new();
    for _ in 0..32 {
      let store = Arc::clone(&store);
      let fp = fp.clone();
      handles.push(tokio::spawn(async move { store.record_if_new(fp, "api").await }));
    }

    let mut inserted = 0;
    for handle in handles {
      if handle.await.unwrap() {
        inserted += 1;
      }
    }
    assert_eq!(inserted, 1);
    assert_eq!(store.count_for("api").await, 1);
  }
}
