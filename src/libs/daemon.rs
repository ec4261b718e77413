//! Foreground watcher behind the `watch` command.
//!
//! Wires the input hook, the configuration file and the state file to a
//! [`Scheduler`] and ticks it once a second until SIGTERM, SIGINT or Ctrl+C.
//! Timer state is saved on the way out.

use crate::libs::activity::ActivityDetector;
use crate::libs::clock::Clock;
use crate::libs::config::{Config, ConfigWatcher};
use crate::libs::event::{BreakEvent, BreakFrontend, BreakHint, BreakId, WindowCommand};
use crate::libs::messages::Message;
use crate::libs::monitor::InputMonitor;
use crate::libs::scheduler::Scheduler;
use crate::libs::state::StateStore;
use crate::{msg_debug, msg_error, msg_info, msg_success, msg_warning};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

const HEARTBEAT: Duration = Duration::from_secs(1);

/// Runs the watcher until a shutdown signal arrives.
pub async fn run_with_signal_handling() -> Result<()> {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let handlers = signal(SignalKind::terminate()).and_then(|sigterm| Ok((sigterm, signal(SignalKind::interrupt())?)));
            let (mut sigterm, mut sigint) = match handlers {
                Ok(handlers) => handlers,
                Err(e) => {
                    msg_error!(Message::WatcherSignalHandlerFailed(e.to_string()));
                    // Keep the sender alive so the watcher is not shut down.
                    std::future::pending::<()>().await;
                    return;
                }
            };

            tokio::select! {
                _ = sigterm.recv() => {
                    msg_info!(Message::WatcherReceivedSigterm);
                }
                _ = sigint.recv() => {
                    msg_info!(Message::WatcherReceivedSigint);
                }
            }

            let _ = shutdown_tx.send(());
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    msg_info!(Message::WatcherReceivedCtrlC);
                    let _ = shutdown_tx.send(());
                }
                Err(e) => {
                    msg_error!(Message::WatcherCtrlCListenFailed(e.to_string()));
                    std::future::pending::<()>().await;
                }
            }
        });
    }

    #[cfg(not(any(unix, windows)))]
    {
        msg_warning!(Message::WatcherSignalHandlingNotSupported);
        tokio::spawn(async move {
            let _sender = shutdown_tx;
            std::future::pending::<()>().await;
        });
    }

    let mut watcher = Watcher::new()?;
    watcher.scheduler.start();
    msg_info!(Message::WatcherStarted(watcher.state_path.clone()));

    let mut interval = tokio::time::interval(HEARTBEAT);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => watcher.tick(),
            _ = &mut shutdown_rx => {
                msg_info!(Message::WatcherShuttingDown);
                break;
            }
        }
    }

    match watcher.scheduler.shutdown() {
        Ok(()) => msg_success!(Message::WatcherStateSaved),
        Err(e) => msg_error!(Message::WatcherStateSaveFailed(e.to_string())),
    }
    Ok(())
}

struct Watcher {
    scheduler: Scheduler,
    config: ConfigWatcher,
    state_path: String,
}

impl Watcher {
    fn new() -> Result<Self> {
        let config_path = Config::path()?;
        let config = Config::read_from(&config_path)?;
        let clock = Clock::system();

        let detector = Arc::new(ActivityDetector::new(clock.clone(), config.monitor().thresholds()));
        InputMonitor::spawn(detector.clone());

        let store = StateStore::new()?;
        let state_path = store.path().display().to_string();
        let scheduler = Scheduler::new(&config, detector, clock, Box::new(ConsoleFrontend)).with_state_store(store);

        Ok(Self {
            scheduler,
            config: ConfigWatcher::new(config_path, config),
            state_path,
        })
    }

    fn tick(&mut self) {
        if let Some((config, keys)) = self.config.poll() {
            msg_info!(Message::ConfigReloaded(keys.len()));
            for key in &keys {
                self.scheduler.apply_config(&config, Some(key));
            }
        }
        self.scheduler.heartbeat();
    }
}

/// Reports break activity on the console.
#[derive(Debug, Default)]
pub struct ConsoleFrontend;

impl BreakFrontend for ConsoleFrontend {
    fn window(&mut self, id: BreakId, command: WindowCommand) {
        match command {
            WindowCommand::CreateBreak(hint) if hint.contains(BreakHint::USER_INITIATED) => {
                msg_info!(Message::BreakStartedByUser(id.label().to_string()));
            }
            other => msg_debug!(format!("{}: {:?}", id, other)),
        }
    }

    fn break_event(&mut self, id: BreakId, event: BreakEvent) {
        let label = id.label().to_string();
        match event {
            BreakEvent::ShowPrelude => msg_warning!(Message::BreakPreludeShown(label)),
            BreakEvent::ShowBreak | BreakEvent::ShowBreakForced => msg_warning!(Message::BreakDue(label)),
            BreakEvent::BreakTaken => msg_success!(Message::BreakTaken(label)),
            BreakEvent::BreakSkipped => msg_info!(Message::BreakSkipped(label)),
            BreakEvent::BreakPostponed => msg_info!(Message::BreakPostponed(label)),
            BreakEvent::BreakIgnored => msg_info!(Message::BreakIgnored(label)),
            BreakEvent::BreakStop => msg_debug!(Message::BreakEnded(label)),
            BreakEvent::BreakStart | BreakEvent::BreakIdle => msg_debug!(format!("{}: {:?}", id, event)),
        }
    }
}
