//! Progress extraction from xorriso pacifier lines
//!
//! The pacifier text is meant for humans and its wording changes between
//! xorriso releases, so the patterns live in [`ProgressRules`] rather than
//! in the extraction code.

use regex::Regex;

use crate::core::Phase;

/// What one pacifier line says about progress
///
/// Only fields actually present in the line are `Some`. Merging into the
/// running [`ProgressSnapshot`](crate::core::ProgressSnapshot) is up to the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub percent: Option<f64>,
    pub fifo_percent: Option<u8>,
    pub speed: Option<String>,
    pub bytes_written: Option<u64>,
    pub bytes_total: Option<u64>,
    pub eta: Option<String>,
}

/// Pattern table driving [`ProgressExtractor`]
#[derive(Debug, Clone)]
pub struct ProgressRules {
    /// A line is a pacifier line only if it contains one of these
    pub markers: Vec<String>,
    /// Keyword to phase, highest priority first
    pub phases: Vec<(String, Phase)>,
    /// Used when a pacifier line names no phase keyword
    pub default_phase: Phase,
    /// Capture 1: percent complete
    pub percent: Regex,
    /// Capture 1: fifo fill percentage
    pub fifo: Regex,
    /// Capture 1: speed label
    pub speed: Regex,
    /// Captures 1 and 2: megabytes written and total
    pub written: Option<Regex>,
    /// Capture 1: estimated time left or finish time
    pub eta: Option<Regex>,
}

impl Default for ProgressRules {
    fn default() -> Self {
        Self {
            markers: vec!["UPDATE".into(), "Writing:".into(), "Verifying".into()],
            phases: vec![
                ("Writing".into(), Phase::Writing),
                ("Blanking".into(), Phase::Formatting),
                ("Formatting".into(), Phase::Formatting),
                ("Verifying".into(), Phase::Verifying),
                ("check_media".into(), Phase::Verifying),
            ],
            default_phase: Phase::Writing,
            percent: Regex::new(r"(\d+\.?\d*)%\s+done").expect("valid percent pattern"),
            fifo: Regex::new(r"fifo\s+(\d+)%").expect("valid fifo pattern"),
            speed: Regex::new(r"(\d+\.?\d*x[A-Z]+|\d+\.?\d*\s*[kMG]B/s)")
                .expect("valid speed pattern"),
            written: Some(
                Regex::new(r"(\d+)\s+of\s+(\d+)\s+MB\s+written").expect("valid written pattern"),
            ),
            eta: None,
        }
    }
}

const MIB: u64 = 1024 * 1024;

/// Turns Info-channel text into [`ProgressUpdate`]s
#[derive(Debug, Clone, Default)]
pub struct ProgressExtractor {
    rules: ProgressRules,
}

impl ProgressExtractor {
    pub fn new(rules: ProgressRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ProgressRules {
        &self.rules
    }

    /// Extract progress from one Info line, `None` if it is not a pacifier line
    pub fn extract(&self, text: &str) -> Option<ProgressUpdate> {
        let rules = &self.rules;
        if !rules.markers.iter().any(|m| text.contains(m.as_str())) {
            return None;
        }

        let phase = rules
            .phases
            .iter()
            .find(|(keyword, _)| text.contains(keyword.as_str()))
            .map(|(_, phase)| *phase)
            .unwrap_or(rules.default_phase);

        let percent = capture(&rules.percent, text)
            .and_then(|s| s.parse::<f64>().ok())
            .map(|p| p.clamp(0.0, 100.0));

        let fifo_percent = capture(&rules.fifo, text)
            .and_then(|s| s.parse::<u32>().ok())
            .map(|p| p.min(100) as u8);

        let speed = capture(&rules.speed, text).map(str::to_string);

        let (bytes_written, bytes_total) = rules
            .written
            .as_ref()
            .and_then(|re| re.captures(text))
            .map(|caps| {
                let mb = |i: usize| {
                    caps.get(i)
                        .and_then(|m| m.as_str().parse::<u64>().ok())
                        .map(|v| v * MIB)
                };
                (mb(1), mb(2))
            })
            .unwrap_or((None, None));

        let eta = rules
            .eta
            .as_ref()
            .and_then(|re| capture(re, text))
            .map(|s| s.trim().to_string());

        Some(ProgressUpdate {
            phase,
            percent,
            fifo_percent,
            speed,
            bytes_written,
            bytes_total,
            eta,
        })
    }
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
}
