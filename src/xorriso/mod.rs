//! xorriso protocol layer
//!
//! Turns the xorriso command line tool into a structured, cancellable
//! operation: argument building, process execution, packet output decoding
//! and progress extraction. Nothing in here knows about burn jobs.

pub mod cancel;
pub mod command;
pub mod executor;
pub mod packet;
pub mod progress;

pub use cancel::CancelToken;
pub use command::CommandBuilder;
pub use executor::{find_in_path, Executor, ProcessOutcome, RunLimits, StreamEvent};
pub use packet::{parse_line, parse_output, Channel, ChannelLines, ClassifiedLine};
pub use progress::{ProgressExtractor, ProgressRules, ProgressUpdate};
