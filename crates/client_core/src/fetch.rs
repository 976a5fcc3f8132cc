//! Fetch lifecycle counter: how many asynchronous domain calls are in flight.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{trace, warn};

/// Serialises as the bare in-flight count. Observers registered through
/// [`FetchCounter::observe`] are not carried across clones or snapshots.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetchCounter {
    count: usize,
    #[serde(skip)]
    observers: Option<Arc<watch::Sender<usize>>>,
}

impl Clone for FetchCounter {
    fn clone(&self) -> Self {
        Self {
            count: self.count,
            observers: None,
        }
    }
}

impl FetchCounter {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_settled(&self) -> bool {
        self.count == 0
    }

    pub fn start(&mut self) {
        self.count += 1;
        self.publish();
    }

    /// Ends one fetch. Reaching zero wakes every [`SettledObserver`]; the
    /// wake-up is delivered on the observer's next poll, never inside this call.
    pub fn done(&mut self) {
        if self.count == 0 {
            warn!("fetch completion reported with no fetch in flight; ignoring");
            return;
        }
        self.count -= 1;
        if self.count == 0 {
            trace!("all fetches settled");
        }
        self.publish();
    }

    pub fn observe(&mut self) -> SettledObserver {
        let count = self.count;
        let sender = self
            .observers
            .get_or_insert_with(|| Arc::new(watch::channel(count).0));
        SettledObserver {
            rx: sender.subscribe(),
        }
    }

    fn publish(&self) {
        if let Some(sender) = &self.observers {
            sender.send_replace(self.count);
        }
    }
}

pub struct SettledObserver {
    rx: watch::Receiver<usize>,
}

impl SettledObserver {
    pub fn is_settled(&self) -> bool {
        *self.rx.borrow() == 0
    }

    /// Resolves once the counter is at zero. Returns immediately when it
    /// already is, or when the counter has been dropped.
    pub async fn settled(&mut self) {
        let _ = self.rx.wait_for(|count| *count == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_start_and_done_return_to_zero() {
        let mut counter = FetchCounter::default();
        for _ in 0..3 {
            counter.start();
        }
        assert_eq!(counter.count(), 3);
        for _ in 0..3 {
            counter.done();
        }
        assert!(counter.is_settled());
    }

    #[test]
    fn done_at_zero_never_goes_negative() {
        let mut counter = FetchCounter::default();
        counter.done();
        assert_eq!(counter.count(), 0);
        counter.start();
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn serializes_as_plain_count_and_drops_observers_on_clone() {
        let mut counter = FetchCounter::default();
        counter.start();
        counter.start();
        let _observer = counter.observe();

        assert_eq!(serde_json::to_string(&counter).expect("json"), "2");
        let restored: FetchCounter = serde_json::from_str("5").expect("json");
        assert_eq!(restored.count(), 5);
        assert!(counter.clone().observers.is_none());
    }

    #[tokio::test]
    async fn observer_is_woken_after_transition_not_inside_done() {
        let mut counter = FetchCounter::default();
        counter.start();
        let mut observer = counter.observe();
        assert!(!observer.is_settled());

        let waiter = tokio::spawn(async move {
            observer.settled().await;
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        counter.done();
        assert!(!waiter.is_finished());
        waiter.await.expect("observer task");
    }

    #[tokio::test]
    async fn observer_resolves_immediately_when_already_settled() {
        let mut counter = FetchCounter::default();
        let mut observer = counter.observe();
        observer.settled().await;
        assert!(observer.is_settled());
    }
}
