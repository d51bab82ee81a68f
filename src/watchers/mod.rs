//! Background log watchers
//!
//! Each watcher is a task reading one line stream and handing every line to
//! a handler. A watch channel carries cancellation; the loop checks it at
//! every await point and stopping waits for the task to finish.

mod parse;
mod source;

pub use parse::{ColorEvent, ColorLogParser, MonitorLogParser};
pub use source::{LineSource, LogSources, TailLogs};

use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A running watcher task
pub struct WatcherHandle {
    name: &'static str,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Spawn `run` on the current runtime with a fresh cancellation token
    pub fn spawn<F, Fut>(name: &'static str, run: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel, token) = watch::channel(false);
        let task = tokio::spawn(run(token));
        info!(watcher = name, "Watcher started");
        Self { name, cancel, task }
    }

    pub fn is_live(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel and wait for the task to wind down
    pub async fn stop(self) {
        // the task may already be gone, which is fine
        let _ = self.cancel.send(true);
        match self.task.await {
            Ok(()) => info!(watcher = self.name, "Watcher stopped"),
            Err(e) if e.is_panic() => error!(watcher = self.name, error = ?e, "Watcher panicked"),
            Err(_) => info!(watcher = self.name, "Watcher aborted"),
        }
    }
}

/// Resolves once cancellation is requested or the handle is gone
pub async fn cancelled(token: &mut watch::Receiver<bool>) {
    let _ = token.wait_for(|stop| *stop).await;
}

/// Feed every line of `source` to `handle` until the stream closes or the
/// token fires. An in-flight handler is dropped on cancellation.
pub async fn run_lines<S, H, Fut>(
    name: &'static str,
    mut source: S,
    mut token: watch::Receiver<bool>,
    mut handle: H,
) where
    S: LineSource,
    H: FnMut(String) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancelled(&mut token) => {
                info!(watcher = name, "Watcher cancelled");
                return;
            }
            next = source.next_line() => next,
        };

        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!(watcher = name, "Log stream closed");
                return;
            }
            Err(e) => {
                error!(watcher = name, error = ?e, "Log stream failed");
                return;
            }
        };

        tokio::select! {
            biased;
            _ = cancelled(&mut token) => {
                info!(watcher = name, "Watcher cancelled mid-event");
                return;
            }
            _ = handle(line) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    fn collecting(seen: Arc<Mutex<Vec<String>>>) -> impl FnMut(String) -> std::future::Ready<()> {
        move |line| {
            seen.lock().unwrap().push(line);
            std::future::ready(())
        }
    }

    async fn wait_finished(handle: &WatcherHandle) {
        for _ in 0..100 {
            if !handle.is_live() {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_lines_reach_handler_until_close() {
        let (tx, rx) = mpsc::channel(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = WatcherHandle::spawn("test", |token| run_lines("test", rx, token, collecting(seen.clone())));

        tx.send("a".to_string()).await.unwrap();
        tx.send("b".to_string()).await.unwrap();
        drop(tx);

        wait_finished(&handle).await;
        handle.stop().await;
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stop_cancels_idle_watcher() {
        let (tx, rx) = mpsc::channel::<String>(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = WatcherHandle::spawn("test", |token| run_lines("test", rx, token, collecting(seen.clone())));
        assert!(handle.is_live());

        // blocks on an empty stream until cancelled
        tokio::time::timeout(std::time::Duration::from_secs(5), handle.stop())
            .await
            .unwrap();
        assert!(seen.lock().unwrap().is_empty());
        drop(tx);
    }

    #[tokio::test]
    async fn test_cancel_drops_in_flight_handler() {
        let (tx, rx) = mpsc::channel(8);
        let finished = Arc::new(Mutex::new(false));
        let flag = finished.clone();
        let handle = WatcherHandle::spawn("test", move |token| {
            run_lines("test", rx, token, move |_line| {
                let flag = flag.clone();
                async move {
                    std::future::pending::<()>().await;
                    *flag.lock().unwrap() = true;
                }
            })
        });

        tx.send("stuck".to_string()).await.unwrap();
        tokio::task::yield_now().await;
        handle.stop().await;
        assert!(!*finished.lock().unwrap());
    }

    #[tokio::test]
    async fn test_finished_watcher_is_not_live() {
        let (tx, rx) = mpsc::channel::<String>(1);
        drop(tx);
        let handle = WatcherHandle::spawn("test", |token| {
            run_lines("test", rx, token, |_| std::future::ready(()))
        });
        wait_finished(&handle).await;
        assert!(!handle.is_live());
    }
}
