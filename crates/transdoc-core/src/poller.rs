//! Fixed-cadence poll loops.
//!
//! A loop only owns its timer. Each tick's work is spawned as its own task, so a
//! hung fetch never holds back the next tick, and cancelling the loop stops future
//! ticks without aborting a fetch that is already in flight.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Stop switch shared by the two loops of one polling generation.
///
/// Dropping the handle stops both loops.
#[derive(Debug)]
pub(crate) struct PollHandle {
    generation: u64,
    cancel: CancellationToken,
}

impl PollHandle {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            cancel: CancellationToken::new(),
        }
    }

    /// Session generation the loops were started for.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Run `tick` every `period` until `cancel` fires.
///
/// The first tick fires one full period after the loop starts. `tick` returns
/// `None` once its owner is gone, which also ends the loop.
pub(crate) fn spawn_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Option<Fut> + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            match tick() {
                Some(work) => {
                    tokio::spawn(work);
                }
                None => break,
            }
        }
        log::debug!("{name} loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn ticks_on_cadence_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = PollHandle::new(1);
        let counter = count.clone();
        spawn_loop("test", Duration::from_secs(1), handle.token(), move || {
            let counter = counter.clone();
            Some(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        drop(handle);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = PollHandle::new(1);
        let counter = count.clone();
        spawn_loop("test", Duration::from_secs(2), handle.token(), move || {
            let counter = counter.clone();
            Some(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tick_does_not_hold_back_the_timer() {
        let started = Arc::new(AtomicUsize::new(0));
        let handle = PollHandle::new(1);
        let counter = started.clone();
        spawn_loop("test", Duration::from_secs(1), handle.token(), move || {
            let counter = counter.clone();
            Some(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
        });

        tokio::time::sleep(Duration::from_millis(4500)).await;
        assert_eq!(started.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn owner_gone_ends_loop() {
        let handle = PollHandle::new(1);
        let join = spawn_loop::<_, std::future::Ready<()>>(
            "test",
            Duration::from_secs(1),
            handle.token(),
            || None,
        );
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(join.is_finished());
    }
}
