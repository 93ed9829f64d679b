//! Checkpoint state: the per-area high-water marks the exporter resumes from.
//!
//! The state is a whole-map value, read once at the start of a run and
//! replaced on disk after every successfully persisted slot. Generation and
//! exchange marks live in separate maps so an area's generation checkpoint
//! never collides with its flow pairs.

use crate::entsoe::Area;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod file;

pub use file::FileStateClient;

/// State store errors.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// State file too large
    #[error("state file too large: {size} bytes (max: {max} bytes)")]
    TooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Lock error
    #[error("lock error: {0}")]
    Lock(String),
}

/// Persisted high-water marks, keyed per area and per exchange pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct State {
    /// Start time of the last persisted generation slot, per area.
    pub last_retrieved_generation_time: BTreeMap<Area, DateTime<Utc>>,
    /// Start time of the last persisted flow slot, per exchange pair key.
    pub last_retrieved_exchange_time: BTreeMap<String, DateTime<Utc>>,
}

impl State {
    /// Map key for an exchange pair.
    pub fn exchange_key(area: Area, peer: Area) -> String {
        format!("{}>{}", area.as_eic_code(), peer.as_eic_code())
    }

    /// Last persisted generation slot for an area.
    pub fn last_generation(&self, area: Area) -> Option<DateTime<Utc>> {
        self.last_retrieved_generation_time.get(&area).copied()
    }

    /// Record a persisted generation slot.
    pub fn record_generation(&mut self, area: Area, measured_at_time: DateTime<Utc>) {
        self.last_retrieved_generation_time
            .insert(area, measured_at_time);
    }

    /// Last persisted flow slot for an exchange pair.
    pub fn last_exchange(&self, area: Area, peer: Area) -> Option<DateTime<Utc>> {
        self.last_retrieved_exchange_time
            .get(&Self::exchange_key(area, peer))
            .copied()
    }

    /// Record a persisted flow slot.
    pub fn record_exchange(&mut self, area: Area, peer: Area, measured_at_time: DateTime<Utc>) {
        self.last_retrieved_exchange_time
            .insert(Self::exchange_key(area, peer), measured_at_time);
    }
}

/// Store for the checkpoint state. Whole-map read and replace semantics.
pub trait StateClient: Send + Sync {
    /// Read the persisted state, `None` when none exists yet.
    fn read_state(&self) -> Result<Option<State>, StateError>;

    /// Replace the persisted state.
    fn store_state(&self, state: &State) -> Result<(), StateError>;
}
