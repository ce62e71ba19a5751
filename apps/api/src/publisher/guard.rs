//! In-process in-flight guard: at most one publish attempt per content id at
//! a time. The DB claim is the cross-process lock; this guard rejects the
//! cheap local races (a publish-now call landing mid-sweep) before a second
//! external call can even be constructed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InFlightGuard {
    inner: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the id. Returns false if another attempt already holds it.
    pub fn try_claim(&self, id: Uuid) -> bool {
        self.inner.lock().expect("in-flight guard poisoned").insert(id)
    }

    pub fn release(&self, id: Uuid) {
        self.inner.lock().expect("in-flight guard poisoned").remove(&id);
    }

    pub fn is_in_flight(&self, id: Uuid) -> bool {
        self.inner
            .lock()
            .expect("in-flight guard poisoned")
            .contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_rejected_until_release() {
        let guard = InFlightGuard::new();
        let id = Uuid::new_v4();
        assert!(guard.try_claim(id));
        assert!(!guard.try_claim(id));
        guard.release(id);
        assert!(guard.try_claim(id));
    }

    #[test]
    fn test_distinct_ids_do_not_contend() {
        let guard = InFlightGuard::new();
        assert!(guard.try_claim(Uuid::new_v4()));
        assert!(guard.try_claim(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_exactly_one_winner_under_concurrent_claims() {
        let guard = InFlightGuard::new();
        let id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move { guard.try_claim(id) }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(guard.is_in_flight(id));
    }
}
