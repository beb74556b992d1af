//! # Expiry Reaper
//!
//! Background task that expires lapsed holds so their stock returns to the
//! pool even if nobody touches the reservation again.
//!
//! ## Task Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Expiry Reaper                                  │
//! │                                                                         │
//! │   ReaperHandle ──── mpsc ────► run loop                                 │
//! │     sweep()      Sweep(reply)    │                                      │
//! │     shutdown()   Shutdown        │   tokio::select! {                   │
//! │                                  │     cmd    => sweep / stop           │
//! │                                  │     tick   => sweep (if enabled)     │
//! │                                  │   }                                  │
//! │                                  ▼                                      │
//! │                       engine.expire_overdue()                           │
//! │                       (release stock, promote waitlist)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lazy expiry on confirm/cancel still applies; the reaper only bounds how
//! long stranded stock can stay held.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::ReaperSettings;
use crate::engine::ReservationEngine;
use crate::error::{EngineError, EngineResult};

/// Periodically sweeps the engine for overdue holds.
pub struct ExpiryReaper {
    engine: Arc<ReservationEngine>,
    settings: ReaperSettings,
}

/// Handle for controlling the reaper.
#[derive(Clone)]
pub struct ReaperHandle {
    /// Command sender.
    cmd_tx: mpsc::Sender<ReaperCommand>,
}

/// Commands for the reaper.
#[derive(Debug)]
enum ReaperCommand {
    /// Sweep now and report how many holds expired.
    Sweep(oneshot::Sender<usize>),
    /// Stop the reaper.
    Shutdown,
}

impl ReaperHandle {
    /// Runs one sweep immediately. Returns the number of expired holds.
    pub async fn sweep(&self) -> EngineResult<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(ReaperCommand::Sweep(reply_tx))
            .await
            .map_err(|_| EngineError::ChannelError("Reaper channel closed".into()))?;

        reply_rx.await.map_err(|_| EngineError::ShuttingDown)
    }

    /// Stops the reaper.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.cmd_tx
            .send(ReaperCommand::Shutdown)
            .await
            .map_err(|_| EngineError::ChannelError("Reaper channel closed".into()))
    }

    /// Returns true once the reaper task has exited.
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

impl ExpiryReaper {
    /// Creates a reaper for `engine`.
    pub fn new(engine: Arc<ReservationEngine>, settings: ReaperSettings) -> Self {
        ExpiryReaper { engine, settings }
    }

    /// Starts the reaper and returns a handle.
    pub fn start(self) -> ReaperHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        tokio::spawn(async move {
            self.run(cmd_rx).await;
        });

        ReaperHandle { cmd_tx }
    }

    /// Main reaper loop.
    async fn run(self, mut cmd_rx: mpsc::Receiver<ReaperCommand>) {
        let period = self.settings.sweep_interval();
        info!(
            enabled = self.settings.enabled,
            interval_secs = period.as_secs(),
            "Expiry reaper started"
        );

        // Sweep timer (only active when periodic sweeping is enabled)
        let mut sweep_interval = interval(period.max(Duration::from_millis(1)));
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(cmd) = cmd_rx.recv() => {
                    match cmd {
                        ReaperCommand::Shutdown => {
                            info!("Expiry reaper shutting down");
                            break;
                        }
                        ReaperCommand::Sweep(reply) => {
                            let expired = self.engine.expire_overdue().await;
                            // Caller may have stopped waiting
                            let _ = reply.send(expired);
                        }
                    }
                }
                _ = sweep_interval.tick(), if self.settings.enabled => {
                    let expired = self.engine.expire_overdue().await;
                    if expired > 0 {
                        debug!(expired, "Periodic sweep released holds");
                    }
                }
                else => {
                    // Every handle dropped and no timer to wait on
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use stockhold_core::ReservationStatus;

    fn engine() -> (Arc<ReservationEngine>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = ReservationEngine::with_clock(&EngineConfig::default(), clock.clone());
        (Arc::new(engine), clock)
    }

    fn manual_only() -> ReaperSettings {
        ReaperSettings {
            enabled: false,
            ..ReaperSettings::default()
        }
    }

    #[tokio::test]
    async fn test_sweep_on_demand() {
        let (engine, clock) = engine();
        engine.initialize_inventory("X", 2).await.unwrap();
        let r = engine
            .create_reservation("X", "alice", 2)
            .await
            .unwrap()
            .into_reservation()
            .unwrap();

        let handle = ExpiryReaper::new(Arc::clone(&engine), manual_only()).start();
        assert_eq!(handle.sweep().await.unwrap(), 0);

        clock.advance(chrono::Duration::seconds(301));
        assert_eq!(handle.sweep().await.unwrap(), 1);

        let stored = engine.get_reservation(r.reservation_id).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Expired);
        assert_eq!(engine.get_inventory("X").await.available_quantity, 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep() {
        let (engine, clock) = engine();
        engine.initialize_inventory("X", 1).await.unwrap();
        engine.create_reservation("X", "alice", 1).await.unwrap();

        let settings = ReaperSettings {
            enabled: true,
            sweep_interval_secs: 1,
        };
        let handle = ExpiryReaper::new(Arc::clone(&engine), settings).start();

        clock.advance(chrono::Duration::seconds(301));
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(engine.get_inventory("X").await.available_quantity, 1);
        assert_eq!(engine.held_quantity("X").await, 0);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let (engine, _) = engine();
        let handle = ExpiryReaper::new(engine, manual_only()).start();

        handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("reaper should stop");

        assert!(handle.sweep().await.is_err());
    }
}
