//! Outbound notifications
//!
//! Progress, state changes and results are pushed to an [`EventSink`] as
//! named events with a serializable payload. Front ends subscribe by
//! handing the controller a sink.

use serde::Serialize;
use std::sync::mpsc;

use super::{BurnResult, Drive, ProgressSnapshot};

pub const EVENT_DEVICE_LIST_UPDATED: &str = "device:list-updated";
pub const EVENT_BURN_PROGRESS: &str = "burn:progress";
pub const EVENT_BURN_STATE_CHANGED: &str = "burn:state-changed";
pub const EVENT_BURN_LOG_LINE: &str = "burn:log-line";
pub const EVENT_BURN_COMPLETE: &str = "burn:complete";
pub const EVENT_BURN_ERROR: &str = "burn:error";

/// Events emitted by the burn controller and device poller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum BurnEvent {
    #[serde(rename = "device:list-updated")]
    DeviceListUpdated(Vec<Drive>),
    #[serde(rename = "burn:progress")]
    Progress(ProgressSnapshot),
    #[serde(rename = "burn:state-changed")]
    StateChanged(String),
    #[serde(rename = "burn:log-line")]
    LogLine(String),
    #[serde(rename = "burn:complete")]
    Complete(BurnResult),
    #[serde(rename = "burn:error")]
    Error(String),
}

impl BurnEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BurnEvent::DeviceListUpdated(_) => EVENT_DEVICE_LIST_UPDATED,
            BurnEvent::Progress(_) => EVENT_BURN_PROGRESS,
            BurnEvent::StateChanged(_) => EVENT_BURN_STATE_CHANGED,
            BurnEvent::LogLine(_) => EVENT_BURN_LOG_LINE,
            BurnEvent::Complete(_) => EVENT_BURN_COMPLETE,
            BurnEvent::Error(_) => EVENT_BURN_ERROR,
        }
    }
}

/// Receiver of controller notifications
///
/// Called from the burn task, in the order events happen.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: BurnEvent);
}

/// Forward events into a channel; a closed receiver just drops them
impl EventSink for mpsc::Sender<BurnEvent> {
    fn emit(&self, event: BurnEvent) {
        let _ = self.send(event);
    }
}

/// Sink that writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: BurnEvent) {
        match &event {
            BurnEvent::Error(msg) => log::error!("{}: {}", event.name(), msg),
            BurnEvent::LogLine(line) => log::debug!("{}: {}", event.name(), line),
            other => log::info!("{}: {:?}", other.name(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = BurnEvent::StateChanged("writing".into());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "burn:state-changed");
        assert_eq!(json["payload"], "writing");
    }

    #[test]
    fn test_event_name_matches_serialized_tag() {
        let events = vec![
            BurnEvent::DeviceListUpdated(vec![]),
            BurnEvent::Progress(ProgressSnapshot::default()),
            BurnEvent::LogLine("x".into()),
            BurnEvent::Complete(BurnResult::default()),
            BurnEvent::Error("boom".into()),
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.name());
        }
    }

    #[test]
    fn test_channel_sink_preserves_order() {
        let (tx, rx) = mpsc::channel();
        tx.emit(BurnEvent::LogLine("one".into()));
        tx.emit(BurnEvent::LogLine("two".into()));
        drop(tx);

        let lines: Vec<_> = rx.iter().collect();
        assert_eq!(
            lines,
            vec![
                BurnEvent::LogLine("one".into()),
                BurnEvent::LogLine("two".into())
            ]
        );
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        tx.emit(BurnEvent::Error("nobody listening".into()));
    }
}
