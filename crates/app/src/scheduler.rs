//! Periodic tasks with cooperative shutdown.
//!
//! The first tick fires immediately, so a task runs once at startup and then
//! every `period`. A tick that runs late is delayed rather than bursted.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest period accepted; `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Sending side of a shutdown signal shared by every periodic task.
#[derive(Debug)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    /// Ask every subscribed task to stop after its current run.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn `task` every `period` until `shutdown` fires or its sender is dropped.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut task: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(MIN_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(task = name, period_ms = period.as_millis(), "periodic task started");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => task().await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(task = name, "periodic task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(
        counter: &Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_run_immediately_then_every_period() {
        let shutdown = Shutdown::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(
            "test",
            Duration::from_secs(5),
            shutdown.subscribe(),
            counting_task(&counter),
        );

        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert!(counter.load(Ordering::SeqCst) >= 3);

        shutdown.trigger();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_running_when_shutdown_triggered() {
        let shutdown = Shutdown::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = spawn_periodic(
            "test",
            Duration::from_secs(5),
            shutdown.subscribe(),
            counting_task(&counter),
        );
        settle().await;

        shutdown.trigger();
        handle.await.unwrap();
        let runs = counter.load(Ordering::SeqCst);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), runs);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_when_shutdown_sender_dropped() {
        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counting_task(&counter);
        let handle = spawn_periodic("test", Duration::from_secs(5), receiver, task);

        drop(shutdown);
        handle.await.unwrap();
    }
}
