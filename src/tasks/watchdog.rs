//! Inactivity watchdog: a single rearmable deadline

use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{debug, info};

use crate::coordinator::Event;

/// Single-shot inactivity deadline.
///
/// At most one deadline is pending. Every arm or cancel bumps the
/// generation, so a fire event that was already queued for an older
/// deadline is recognized as stale.
#[derive(Debug)]
pub struct Watchdog {
    threshold: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<Event>,
}

impl Watchdog {
    pub fn new(threshold: Duration, events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            threshold,
            generation: 0,
            pending: None,
            events,
        }
    }

    /// Replace any pending deadline with a fresh one `threshold` from now
    pub fn rearm(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let threshold = self.threshold;
        let events = self.events.clone();
        self.pending = Some(tokio::spawn(async move {
            sleep(threshold).await;
            info!("No activity for {}s, inactivity deadline reached", threshold.as_secs());
            if events.send(Event::WatchdogFired { generation }).is_err() {
                debug!("Coordinator gone, dropping watchdog fire {}", generation);
            }
        }));
        generation
    }

    /// Drop the pending deadline without scheduling another
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    /// Consume a fire event. Returns true only for the live deadline.
    pub fn accept_fire(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            debug!(
                "Ignoring stale watchdog fire {} (current {})",
                generation, self.generation
            );
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watchdog(secs: u64) -> (Watchdog, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Watchdog::new(Duration::from_secs(secs), tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_threshold() {
        let (mut dog, mut rx) = watchdog(600);
        let generation = dog.rearm();

        sleep(Duration::from_secs(599)).await;
        assert!(rx.try_recv().is_err());

        sleep(Duration::from_secs(2)).await;
        match rx.try_recv() {
            Ok(Event::WatchdogFired { generation: fired }) => {
                assert_eq!(fired, generation);
                assert!(dog.accept_fire(fired));
            }
            other => panic!("expected watchdog fire, got {:?}", other),
        }
        assert!(!dog.is_armed());

        sleep(Duration::from_secs(1200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_postpones_deadline() {
        let (mut dog, mut rx) = watchdog(10);
        dog.rearm();
        sleep(Duration::from_secs(8)).await;
        let generation = dog.rearm();
        sleep(Duration::from_secs(8)).await;
        assert!(rx.try_recv().is_err());

        sleep(Duration::from_secs(3)).await;
        match rx.try_recv() {
            Ok(Event::WatchdogFired { generation: fired }) => assert_eq!(fired, generation),
            other => panic!("expected watchdog fire, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_fire() {
        let (mut dog, mut rx) = watchdog(10);
        dog.rearm();
        assert!(dog.cancel());
        assert!(!dog.cancel());
        sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());
        assert!(!dog.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn queued_fire_from_older_deadline_is_stale() {
        let (mut dog, _rx) = watchdog(10);
        let old = dog.rearm();
        let current = dog.rearm();
        assert!(!dog.accept_fire(old));
        assert!(dog.is_armed());
        assert!(dog.accept_fire(current));
        assert!(!dog.accept_fire(current));
    }
}
