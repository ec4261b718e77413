//! Timer state file.
//!
//! ```text
//! WorkRaveState 3
//! 1710039540
//! micro_pause 1710039540 42 0 0 0 0 0 3600
//! rest_break 1710039540 1260 0 0 0 0 0 3600
//! daily_limit 1710039540 5400 1710036000 0 0 0 0 3600
//! ```
//!
//! A file that cannot be read completely is treated as absent. Nothing is
//! applied until every line has been parsed.

use super::data_storage::DataStorage;
use super::error::StateError;
use super::timer::TimerSnapshot;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const STATE_FILE_NAME: &str = "state";
pub const STATE_MAGIC: &str = "WorkRaveState";
pub const STATE_VERSION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedState {
    pub version: u32,
    pub saved_at: i64,
    /// Timer name and its snapshot, in file order.
    pub timers: Vec<(String, TimerSnapshot)>,
}

impl SavedState {
    pub fn timer(&self, name: &str) -> Option<&TimerSnapshot> {
        self.timers.iter().find(|(id, _)| id == name).map(|(_, snapshot)| snapshot)
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store in the platform data directory.
    pub fn new() -> Result<Self, StateError> {
        let path = DataStorage::new()
            .get_path(STATE_FILE_NAME)
            .map_err(|source| StateError::Io {
                path: PathBuf::from(STATE_FILE_NAME),
                source,
            })?;
        Ok(Self { path })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the header and one line per timer.
    pub fn write(&self, saved_at: i64, lines: &[String]) -> Result<(), StateError> {
        let io_error = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };
        let mut contents = format!("{} {}\n{}\n", STATE_MAGIC, STATE_VERSION, saved_at);
        for line in lines {
            contents.push_str(line);
            contents.push('\n');
        }

        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).map_err(io_error)?;
        file.write_all(contents.as_bytes()).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        fs::rename(&tmp, &self.path).map_err(io_error)?;
        Ok(())
    }

    /// Reads the file. `Ok(None)` when there is no file yet.
    pub fn read(&self) -> Result<Option<SavedState>, StateError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        parse(&contents).map(Some)
    }
}

pub fn parse(contents: &str) -> Result<SavedState, StateError> {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());

    let header = lines.next().ok_or(StateError::Empty)?;
    let version = match header.split_whitespace().collect::<Vec<_>>().as_slice() {
        [magic, version] if *magic == STATE_MAGIC => version
            .parse::<u32>()
            .map_err(|_| StateError::BadHeader(header.to_string()))?,
        _ => return Err(StateError::BadHeader(header.to_string())),
    };
    if !(1..=STATE_VERSION).contains(&version) {
        return Err(StateError::UnsupportedVersion(version));
    }

    let saved_line = lines.next().ok_or(StateError::Empty)?;
    let saved_at = saved_line.trim().parse::<i64>().map_err(|e| StateError::MalformedRecord {
        line: saved_line.to_string(),
        reason: e.to_string(),
    })?;

    let mut timers = Vec::new();
    for line in lines {
        let (id, fields) = line.trim().split_once(' ').ok_or_else(|| StateError::MalformedRecord {
            line: line.to_string(),
            reason: "missing fields".to_string(),
        })?;
        timers.push((id.to_string(), TimerSnapshot::parse(fields, version)?));
    }

    Ok(SavedState {
        version,
        saved_at,
        timers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_all_versions() {
        let v3 = "WorkRaveState 3\n100\nmicro_pause 100 42 0 7 1 0 0 3600\n";
        let state = parse(v3).unwrap();
        assert_eq!(state.version, 3);
        assert_eq!(state.saved_at, 100);
        let micro = state.timer("micro_pause").unwrap();
        assert_eq!(micro.elapsed, 42);
        assert_eq!(micro.total_overdue, 7);
        assert!(micro.snooze_inhibited);
        assert_eq!(micro.tz_offset, Some(3600));

        let v1 = "WorkRaveState 1\n100\nrest_break 100 5 0 0 0 0 0\n";
        assert_eq!(parse(v1).unwrap().timer("rest_break").unwrap().elapsed, 5);
    }

    #[test]
    fn rejects_bad_files() {
        assert!(matches!(parse(""), Err(StateError::Empty)));
        assert!(matches!(parse("Something 3\n1\n"), Err(StateError::BadHeader(_))));
        assert!(matches!(parse("WorkRaveState 9\n1\n"), Err(StateError::UnsupportedVersion(9))));
        assert!(matches!(
            parse("WorkRaveState 3\n1\nmicro_pause 1 2 3 4 0 0 0 0\nrest_break x\n"),
            Err(StateError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::at(dir.path().join("state"));
        assert!(store.read().unwrap().is_none());

        store
            .write(500, &["daily_limit 500 60 400 0 0 0 0 0".to_string()])
            .unwrap();
        let state = store.read().unwrap().unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.saved_at, 500);
        assert_eq!(state.timer("daily_limit").unwrap().last_pred_reset, 400);
        assert!(!dir.path().join("state.tmp").exists());
    }
}
