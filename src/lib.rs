//! # Respite - break reminders driven by keyboard and mouse activity
//!
//! Watches input activity and runs three break timers: a short micro-break,
//! a longer rest break and a daily usage limit. When a timer reaches its
//! limit the user is prompted to step away; resting long enough resets it.
//!
//! ## Features
//!
//! - **Activity Detection**: Noise filtering, sustained activity and idle timeout
//! - **Break Timers**: Limits, idle auto-reset, wall-clock reset rules, snooze
//! - **Break Flow**: Preludes, postpone and skip, forced breaks
//! - **Operation Modes**: Normal, quiet and suspended, with timed overrides
//! - **Persistence**: Timer state survives restarts
//!
//! ## Usage
//!
//! ```rust,no_run
//! use respite::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Cli::menu().await
//! }
//! ```

pub mod commands;
pub mod libs;
