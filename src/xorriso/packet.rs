//! Decoder for xorriso's `-pkt_output` line protocol
//!
//! With packet output enabled every message line has the form
//! `<channel>:<mode>:<text>`. The channel tells what kind of message it is,
//! the mode digit says whether `text` carries its own line end (non-zero)
//! or had one appended by xorriso for display (zero).

use serde::Serialize;

/// Which xorriso message channel a line arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Channel {
    /// `R`: answers to queries and completion confirmations
    Result,
    /// `I`: human readable diagnostics and pacifier lines
    Info,
    /// `M`: markers between steps of a command sequence
    Mark,
}

impl Channel {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'R' => Some(Channel::Result),
            b'I' => Some(Channel::Info),
            b'M' => Some(Channel::Mark),
            _ => None,
        }
    }
}

/// One decoded protocol line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedLine {
    pub channel: Channel,
    pub mode: u8,
    pub text: String,
}

/// Decode one raw line, terminator included if it had one
///
/// Returns `None` for anything that is not protocol data.
pub fn parse_line(line: &str) -> Option<ClassifiedLine> {
    let bytes = line.as_bytes();
    if bytes.len() < 4 || bytes[1] != b':' || bytes[3] != b':' {
        return None;
    }

    let channel = Channel::from_byte(bytes[0])?;
    let mode = (bytes[2] as char).to_digit(10)? as u8;

    // The first four bytes are ASCII, so index 4 is a char boundary
    let mut text = &line[4..];
    if mode == 0 {
        text = strip_one_terminator(text);
    }

    Some(ClassifiedLine {
        channel,
        mode,
        text: text.to_string(),
    })
}

fn strip_one_terminator(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

/// Lines of a finished invocation sorted by channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelLines {
    pub result_lines: Vec<String>,
    pub info_lines: Vec<String>,
    pub mark_lines: Vec<String>,
}

impl ChannelLines {
    /// File a decoded line under its channel
    pub fn push(&mut self, line: ClassifiedLine) {
        match line.channel {
            Channel::Result => self.result_lines.push(line.text),
            Channel::Info => self.info_lines.push(line.text),
            Channel::Mark => self.mark_lines.push(line.text),
        }
    }
}

/// Decode a complete captured output
pub fn parse_output(output: &str) -> ChannelLines {
    let mut lines = ChannelLines::default();
    for raw in output.split_inclusive('\n') {
        if let Some(line) = parse_line(raw) {
            lines.push(line);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_line() {
        let line = parse_line("R:1:Drive current: -dev '/dev/sr0'").unwrap();
        assert_eq!(line.channel, Channel::Result);
        assert_eq!(line.mode, 1);
        assert_eq!(line.text, "Drive current: -dev '/dev/sr0'");
    }

    #[test]
    fn test_mode_zero_strips_one_terminator() {
        let line = parse_line("R:0:done\n").unwrap();
        assert_eq!(line.text, "done");

        let line = parse_line("R:0:done\n\n").unwrap();
        assert_eq!(line.text, "done\n");
    }

    #[test]
    fn test_nonzero_mode_keeps_terminator() {
        let line = parse_line("R:1:done\n").unwrap();
        assert_eq!(line.text, "done\n");
    }

    #[test]
    fn test_non_protocol_lines_are_dropped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("R:1").is_none());
        assert!(parse_line("xorriso 1.5.6 : RockRidge filesystem manipulator").is_none());
        assert!(parse_line("RR:1:text").is_none());
        assert!(parse_line("R-1:text").is_none());
        assert!(parse_line("R:x:text").is_none());
    }

    #[test]
    fn test_unknown_channel_is_dropped() {
        assert!(parse_line("X:0:text").is_none());
        assert!(parse_line("r:0:text").is_none());
    }

    #[test]
    fn test_empty_text_is_allowed() {
        let line = parse_line("M:0:").unwrap();
        assert_eq!(line.channel, Channel::Mark);
        assert_eq!(line.text, "");
    }

    #[test]
    fn test_multibyte_text_survives() {
        let line = parse_line("I:1:Überschrift – ok").unwrap();
        assert_eq!(line.text, "Überschrift – ok");
    }

    #[test]
    fn test_parse_output_sorts_by_channel() {
        let output = "R:1:answer\nI:0:note\ngarbage\nM:0:step 1\nI:0:second note\n";
        let lines = parse_output(output);
        assert_eq!(lines.result_lines, vec!["answer\n"]);
        assert_eq!(lines.info_lines, vec!["note", "second note"]);
        assert_eq!(lines.mark_lines, vec!["step 1"]);
    }
}
