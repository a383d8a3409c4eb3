//! Tick scheduler
//!
//! Drives [`ScreenManager::on_tick`] from a tokio interval until told to
//! stop. The manager lock is held only for the synchronous tick pass and
//! never across an await.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use parking_lot::Mutex;
//! use tilewall_screen::{EngineConfig, RecordingSink, ScreenManager, Scheduler, Viewer};
//! use tokio::sync::watch;
//!
//! # async fn example() -> tilewall_screen::Result<()> {
//! let manager = Arc::new(Mutex::new(ScreenManager::new(EngineConfig::default())?));
//! let scheduler = Scheduler::from_manager(Arc::clone(&manager));
//! let (stop_tx, stop_rx) = watch::channel(false);
//!
//! let viewers: Vec<Viewer> = Vec::new();
//! let mut sink = RecordingSink::new();
//! tokio::spawn(async move {
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     let _ = stop_tx.send(true);
//! });
//! scheduler.run(&viewers, &mut sink, stop_rx).await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::manager::ScreenManager;
use crate::viewer::{TileSink, ViewerDirectory};

/// Fixed-rate driver for a shared [`ScreenManager`]
#[derive(Debug, Clone)]
pub struct Scheduler {
    manager: Arc<Mutex<ScreenManager>>,
    interval: Duration,
}

impl Scheduler {
    /// Scheduler ticking every `interval`
    #[must_use]
    pub fn new(manager: Arc<Mutex<ScreenManager>>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Scheduler ticking at the manager's configured rate
    #[must_use]
    pub fn from_manager(manager: Arc<Mutex<ScreenManager>>) -> Self {
        let interval = manager.lock().config().tick_interval();
        Self::new(manager, interval)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick until `shutdown` turns `true` or its sender is dropped
    ///
    /// Late ticks are delayed, not bunched up. Returns the number of ticks
    /// driven.
    pub async fn run<D, S>(&self, directory: &D, sink: &mut S, mut shutdown: watch::Receiver<bool>) -> u64
    where
        D: ViewerDirectory,
        S: TileSink,
    {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Scheduler started. Tick interval: {:?}", self.interval);

        let mut ticks = 0u64;
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    let tick = self.manager.lock().on_tick(directory, sink);
                    ticks += 1;
                    if tick % 200 == 0 {
                        debug!("Tick #{}", tick);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Scheduler stopped after {} tick(s)", ticks);
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilewall_frame::GridSize;

    use crate::config::EngineConfig;
    use crate::group::GroupSpec;
    use crate::viewer::{Position, RecordingSink, Viewer};

    fn shared_manager() -> Arc<Mutex<ScreenManager>> {
        let manager = ScreenManager::new(EngineConfig::default()).expect("manager");
        Arc::new(Mutex::new(manager))
    }

    #[test]
    fn test_interval_from_config() {
        let scheduler = Scheduler::from_manager(shared_manager());
        assert_eq!(scheduler.interval(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_shutdown() {
        let manager = shared_manager();
        let id = {
            let mut m = manager.lock();
            let id = m
                .bind(GroupSpec::sequential("world", GridSize { cols: 1, rows: 1 }, 1))
                .expect("bind");
            m.reset_to_black(id).expect("black");
            id
        };

        let scheduler = Scheduler::new(Arc::clone(&manager), Duration::from_millis(50));
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(175)).await;
            let _ = tx.send(true);
        });

        let viewers = vec![Viewer::new(1, "world", Position::default())];
        let mut sink = RecordingSink::new();
        let ticks = scheduler.run(&viewers, &mut sink, rx).await;

        assert!(ticks >= 3);
        assert_eq!(manager.lock().clock().now(), ticks);
        // The black frame goes out once, on the first tick
        assert_eq!(sink.sends.len(), 1);
        assert!(manager.lock().describe(id).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops() {
        let scheduler = Scheduler::new(shared_manager(), Duration::from_millis(10));
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let viewers: Vec<Viewer> = Vec::new();
        let mut sink = RecordingSink::new();
        let ticks = scheduler.run(&viewers, &mut sink, rx).await;
        assert!(ticks <= 1);
    }
}
