//! Burn job state types
//!
//! Contains the types that describe one tracked burn:
//! - BurnState: lifecycle state of a job
//! - Phase: what the drive is doing, as reported to listeners
//! - ProgressSnapshot: latest known progress, merged line by line
//! - BurnJob / BurnResult: the job record and its success summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::xorriso::ProgressUpdate;

/// Lifecycle state of a burn job
///
/// `Pending -> Writing -> [Verifying] -> Done | Error | Cancelled`.
/// `Formatting` is reported for standalone blank/format runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnState {
    Pending,
    Formatting,
    Writing,
    Verifying,
    Done,
    Error,
    Cancelled,
}

impl BurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BurnState::Done | BurnState::Error | BurnState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BurnState::Pending => "pending",
            BurnState::Formatting => "formatting",
            BurnState::Writing => "writing",
            BurnState::Verifying => "verifying",
            BurnState::Done => "done",
            BurnState::Error => "error",
            BurnState::Cancelled => "cancelled",
        }
    }
}

/// Operation phase carried in progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Writing,
    Blanking,
    Formatting,
    Verifying,
}

/// Latest known progress of an operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub phase: Phase,
    pub percent: f64,
    pub fifo_fill: u8,
    pub speed: String,
    pub bytes_written: u64,
    pub bytes_total: u64,
    pub eta: String,
}

impl ProgressSnapshot {
    /// Merge a pacifier update; fields the line did not mention keep their value
    pub fn apply(&mut self, update: &ProgressUpdate) {
        self.phase = update.phase;
        if let Some(percent) = update.percent {
            self.percent = percent;
        }
        if let Some(fifo) = update.fifo_percent {
            self.fifo_fill = fifo;
        }
        if let Some(speed) = &update.speed {
            self.speed = speed.clone();
        }
        if let Some(written) = update.bytes_written {
            self.bytes_written = written;
        }
        if let Some(total) = update.bytes_total {
            self.bytes_total = total;
        }
        if let Some(eta) = &update.eta {
            self.eta = eta.clone();
        }
    }
}

/// Summary of a successful burn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnResult {
    pub success: bool,
    pub bytes_written: u64,
    pub duration: String,
    pub average_speed: String,
    pub md5_match: bool,
    pub verify_errors: u32,
}

/// One tracked burn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnJob {
    pub id: String,
    pub state: BurnState,
    pub progress: ProgressSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BurnResult>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BurnJob {
    pub fn new(id: String) -> Self {
        Self {
            id,
            state: BurnState::Pending,
            progress: ProgressSnapshot::default(),
            result: None,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }
}

/// Human readable duration like `12m 03s`
pub fn format_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else {
        format!("{}m {:02}s", m, s)
    }
}
