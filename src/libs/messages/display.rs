//! Display implementation for respite messages.
//!
//! Every user-facing string lives here, so wording stays consistent across
//! the CLI and the watcher's console output.

use super::types::Message;
use std::fmt;

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            // === CONFIGURATION MESSAGES ===
            Message::ConfigSaved => "Configuration saved successfully".to_string(),
            Message::ConfigDefaultsSaved(path) => format!("Default configuration written to {}", path),
            Message::ConfigDeleted(path) => format!("Configuration removed: {}", path),
            Message::ConfigNotFound => "No configuration file found, nothing to delete".to_string(),
            Message::ConfigReloaded(count) => format!("Configuration reloaded ({} settings changed)", count),
            Message::ConfigUnreadable(error) => format!("Configuration file is unreadable: {}", error),
            Message::ConfigModuleMonitor => "Activity detection".to_string(),
            Message::ConfigModuleGeneral => "Modes and insist policy".to_string(),
            Message::ConfigModuleBreak(label) => format!("{} settings", label),

            // === CONFIGURATION PROMPTS ===
            Message::PromptSelectModules => "Select the settings to configure".to_string(),
            Message::PromptBreakEnabled => "Enable this break".to_string(),
            Message::PromptBreakLimit => "Active time before the break (seconds)".to_string(),
            Message::PromptBreakAutoReset => "Rest that counts as a break (seconds, 0 to disable)".to_string(),
            Message::PromptBreakResetRule => "Wall-clock reset rule (e.g. day/4:00, empty for none)".to_string(),
            Message::PromptBreakSnooze => "Reminder repeat interval (seconds)".to_string(),
            Message::PromptBreakMaxPreludes => "Preludes before the break is enforced (-1 for unlimited)".to_string(),
            Message::PromptUseMicroBreakActivity => "Count activity from the micro-pause timer".to_string(),
            Message::PromptNoiseThreshold => "Noise threshold (ms)".to_string(),
            Message::PromptActivityThreshold => "Activity threshold (ms)".to_string(),
            Message::PromptIdleThreshold => "Idle threshold (ms)".to_string(),
            Message::PromptSensitivity => "Pointer sensitivity (pixels)".to_string(),
            Message::PromptOperationMode => "Operation mode".to_string(),
            Message::PromptUsageMode => "Usage mode".to_string(),
            Message::PromptInsistPolicy => "Activity during a break".to_string(),

            // === WATCHER MESSAGES ===
            Message::WatcherStarted(path) => format!("Watching activity, timer state in {}", path),
            Message::WatcherReceivedSigterm => "Received SIGTERM, shutting down".to_string(),
            Message::WatcherReceivedSigint => "Received SIGINT, shutting down".to_string(),
            Message::WatcherReceivedCtrlC => "Received Ctrl+C, shutting down".to_string(),
            Message::WatcherCtrlCListenFailed(error) => format!("Failed to listen for Ctrl+C: {}", error),
            Message::WatcherSignalHandlerFailed(error) => format!("Failed to install signal handler: {}", error),
            Message::WatcherSignalHandlingNotSupported => "Signal handling is not supported on this platform".to_string(),
            Message::WatcherShuttingDown => "Watcher shutting down".to_string(),
            Message::WatcherStateSaved => "Timer state saved".to_string(),
            Message::WatcherStateSaveFailed(error) => format!("Failed to save timer state: {}", error),

            // === INPUT MONITOR MESSAGES ===
            Message::MonitorStarted => "Input monitor started".to_string(),
            Message::ErrorInRdevListener(error) => format!("Error in rdev listener: {}. Retrying in 1 second...", error),

            // === BREAK MESSAGES ===
            Message::BreakPreludeShown(label) => format!("{} coming up", label),
            Message::BreakDue(label) => format!("Time for a {}", label.to_lowercase()),
            Message::BreakStartedByUser(label) => format!("{} started", label),
            Message::BreakTaken(label) => format!("{} taken, well done", label),
            Message::BreakSkipped(label) => format!("{} skipped", label),
            Message::BreakPostponed(label) => format!("{} postponed", label),
            Message::BreakIgnored(label) => format!("{} reminder ignored", label),
            Message::BreakEnded(label) => format!("{} over", label),

            // === STATUS MESSAGES ===
            Message::StatusHeader => "Break timers".to_string(),
            Message::StatusNoState => "No timer state saved yet. Run 'respite watch' first.".to_string(),
            Message::StatusSavedAt(time) => format!("Saved at {}", time),
            Message::StatusStateUnreadable(error) => format!("Timer state file is unreadable: {}", error),
            Message::StatusNextDailyReset(time) => format!("Daily limit resets at {}", time),
        };

        write!(f, "{}", text)
    }
}
