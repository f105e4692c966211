//! xorriso-burner
//!
//! Drives the `xorriso` command-line tool to burn, verify, blank and format
//! optical discs, and to inspect drives and media. The layers:
//!
//! - `xorriso`: command building, packet output parsing, progress
//!   extraction and the process executor
//! - `burning`: the burn job controller
//! - `devices`: drive and media queries, device polling
//! - `core`: data model, events and settings

pub mod burning;
pub mod core;
pub mod devices;
pub mod error;
pub mod logging;
pub mod xorriso;

#[cfg(all(test, unix))]
mod test_fixtures;

pub use burning::BurnController;
pub use devices::{DevicePoller, DriveQueries, QueryTimeouts};
pub use error::{BurnError, ExecError};
