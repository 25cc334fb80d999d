//! Per-account async mutexes.
//!
//! Transfers touching the same account are serialized; transfers on disjoint
//! accounts proceed in parallel. Multi-account acquisition always happens in
//! ascending name order, so two transfers can never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::store::StoreError;

/// Entries beyond this count are pruned when no one holds them.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub struct AccountLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Guards held for the duration of one transfer.
#[derive(Debug)]
pub struct HeldLocks {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every named account, deduplicated, in sorted order.
    pub async fn acquire(&self, names: &[&str]) -> Result<HeldLocks, StoreError> {
        let mut ordered: Vec<&str> = names.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let mutexes = {
            let mut table = self.table.lock().map_err(|_| StoreError::Poisoned)?;
            if table.len() > PRUNE_THRESHOLD {
                table.retain(|_, m| Arc::strong_count(m) > 1);
            }
            ordered
                .iter()
                .map(|name| {
                    table
                        .entry((*name).to_string())
                        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                        .clone()
                })
                .collect::<Vec<_>>()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }
        Ok(HeldLocks { _guards: guards })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().map(|t| t.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_name_twice_does_not_self_deadlock() {
        let locks = AccountLocks::new();
        let held = tokio::time::timeout(Duration::from_secs(1), locks.acquire(&["a", "a"]))
            .await
            .expect("acquire should not block")
            .unwrap();
        drop(held);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn overlapping_acquisitions_are_serialized() {
        let locks = Arc::new(AccountLocks::new());
        let first = locks.acquire(&["b", "a"]).await.unwrap();

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire(&["a", "c"]).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should proceed once released")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn disjoint_acquisitions_do_not_wait() {
        let locks = AccountLocks::new();
        let _ab = locks.acquire(&["a", "b"]).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), locks.acquire(&["c", "d"]))
            .await
            .expect("disjoint names should not contend")
            .unwrap();
    }
}
