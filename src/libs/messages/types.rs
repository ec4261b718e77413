#[derive(Debug, Clone)]
pub enum Message {
    // === CONFIGURATION MESSAGES ===
    ConfigSaved,
    ConfigDefaultsSaved(String), // path
    ConfigDeleted(String),       // path
    ConfigNotFound,
    ConfigReloaded(usize), // number of changed settings
    ConfigUnreadable(String), // error
    ConfigModuleMonitor,
    ConfigModuleGeneral,
    ConfigModuleBreak(String), // break label

    // === CONFIGURATION PROMPTS ===
    PromptSelectModules,
    PromptBreakEnabled,
    PromptBreakLimit,
    PromptBreakAutoReset,
    PromptBreakResetRule,
    PromptBreakSnooze,
    PromptBreakMaxPreludes,
    PromptUseMicroBreakActivity,
    PromptNoiseThreshold,
    PromptActivityThreshold,
    PromptIdleThreshold,
    PromptSensitivity,
    PromptOperationMode,
    PromptUsageMode,
    PromptInsistPolicy,

    // === WATCHER MESSAGES ===
    WatcherStarted(String), // state file path
    WatcherReceivedSigterm,
    WatcherReceivedSigint,
    WatcherReceivedCtrlC,
    WatcherCtrlCListenFailed(String),
    WatcherSignalHandlerFailed(String),
    WatcherSignalHandlingNotSupported,
    WatcherShuttingDown,
    WatcherStateSaved,
    WatcherStateSaveFailed(String),

    // === INPUT MONITOR MESSAGES ===
    MonitorStarted,
    ErrorInRdevListener(String),

    // === BREAK MESSAGES ===
    BreakPreludeShown(String),
    BreakDue(String),
    BreakStartedByUser(String),
    BreakTaken(String),
    BreakSkipped(String),
    BreakPostponed(String),
    BreakIgnored(String),
    BreakEnded(String),

    // === STATUS MESSAGES ===
    StatusHeader,
    StatusNoState,
    StatusSavedAt(String),
    StatusStateUnreadable(String),
    StatusNextDailyReset(String),
}
