//! Burning module - burn jobs, verification, blank and format
//!
//! This module is front-end agnostic. Progress and state reach the outside
//! world through an [`EventSink`](crate::core::EventSink).

pub mod controller;

pub use controller::{burn_command, BurnController};
