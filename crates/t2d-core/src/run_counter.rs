//! Persisted item count used to skip repeated "nothing here" notifications.
//!
//! Transition table, previous run → this run:
//!
//! | previous \ current | Empty    | HasItems |
//! |--------------------|----------|----------|
//! | Unknown            | notify   | notify   |
//! | Empty              | suppress | notify   |
//! | HasItems           | notify   | notify   |

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Count stored when no previous run is on record.
pub const FRESH: i64 = -1;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("Failed to read run counter {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write run counter {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Run counter {path} does not hold an integer: {content:?}")]
    Corrupt { path: PathBuf, content: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedState {
    Unknown,
    Empty,
    HasItems,
}

impl ObservedState {
    pub fn from_count(count: i64) -> Self {
        match count {
            0 => Self::Empty,
            c if c > 0 => Self::HasItems,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Notify,
    Suppress,
}

impl Gate {
    pub fn between(previous: ObservedState, current: ObservedState) -> Self {
        match (previous, current) {
            (ObservedState::Empty, ObservedState::Empty) => Self::Suppress,
            _ => Self::Notify,
        }
    }

    pub fn should_notify(self) -> bool {
        self == Self::Notify
    }
}

/// A single-line file holding the item count of the previous run.
#[derive(Debug, Clone)]
pub struct RunCounter {
    path: PathBuf,
}

impl RunCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored count, or [`FRESH`] when the file does not exist.
    pub fn read(&self) -> Result<i64, CounterError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FRESH),
            Err(source) => {
                return Err(CounterError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        content
            .trim()
            .parse()
            .map_err(|_| CounterError::Corrupt {
                path: self.path.clone(),
                content,
            })
    }

    /// Replace the stored count. The new value lands in a sibling temp file
    /// first and is renamed over the old one.
    pub fn write(&self, count: usize) -> Result<(), CounterError> {
        let err = |source: io::Error| CounterError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(err)?;
        }
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(format!(".{}.tmp", std::process::id()));
        let tmp = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp).map_err(err)?;
        file.write_all(count.to_string().as_bytes()).map_err(err)?;
        file.sync_all().map_err(err)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(err)
    }

    /// Record this run's count and decide whether to notify.
    pub fn record(&self, current: usize) -> Result<Gate, CounterError> {
        let previous = self.read()?;
        self.write(current)?;
        let gate = gate_for(previous, current);
        debug!(path = %self.path.display(), previous, current, ?gate, "Run counter updated");
        Ok(gate)
    }

    /// Decide without touching the file.
    pub fn peek(&self, current: usize) -> Result<Gate, CounterError> {
        Ok(gate_for(self.read()?, current))
    }
}

fn gate_for(previous: i64, current: usize) -> Gate {
    Gate::between(
        ObservedState::from_count(previous),
        ObservedState::from_count(current as i64),
    )
}
