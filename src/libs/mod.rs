//! Core library modules.
//!
//! ## Layout
//!
//! - **Detection**: `activity`, `monitor`, `source`
//! - **Breaks**: `timer`, `time_pred`, `break_model`, `event`
//! - **Coordination**: `scheduler`, `modes`, `statistics`, `daemon`
//! - **Infrastructure**: `clock`, `config`, `data_storage`, `error`, `state`, `messages`
//! - **Console**: `formatter`, `view`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use respite::libs::activity::{ActivityDetector, Thresholds};
//! use respite::libs::clock::Clock;
//! use respite::libs::config::Config;
//! use respite::libs::event::NullFrontend;
//! use respite::libs::scheduler::Scheduler;
//! use std::sync::Arc;
//!
//! let clock = Clock::system();
//! let detector = Arc::new(ActivityDetector::new(clock.clone(), Thresholds::default()));
//! let mut scheduler = Scheduler::new(&Config::defaults(), detector, clock, Box::new(NullFrontend));
//! scheduler.heartbeat();
//! ```

pub mod activity;
pub mod break_model;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod data_storage;
pub mod error;
pub mod event;
pub mod formatter;
pub mod messages;
pub mod modes;
pub mod monitor;
pub mod scheduler;
pub mod source;
pub mod state;
pub mod statistics;
pub mod time_pred;
pub mod timer;
pub mod view;
