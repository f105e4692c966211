//! Core data model
//!
//! This module contains:
//! - Burn job state, progress snapshots and results
//! - Project description (file mapping, ISO and write options)
//! - Drive and media descriptions
//! - Outbound events and the sink trait
//! - Persisted settings

mod device;
mod events;
mod job;
mod project;
mod settings;

pub use device::{Drive, MediaInfo, MediaProfile, SpeedDescriptor};
pub use events::{
    BurnEvent, EventSink, LogSink, EVENT_BURN_COMPLETE, EVENT_BURN_ERROR, EVENT_BURN_LOG_LINE,
    EVENT_BURN_PROGRESS, EVENT_BURN_STATE_CHANGED, EVENT_DEVICE_LIST_UPDATED,
};
pub use job::{format_duration, BurnJob, BurnResult, BurnState, Phase, ProgressSnapshot};
pub use project::{BurnOptions, FileEntry, IsoOptions, Project};
pub use settings::Settings;
