//! Common utilities for the Canopy view engine.
//!
//! This crate provides shared infrastructure used by all Canopy components:
//! - **Warning System** - injectable diagnostic sinks for non-fatal problems,
//!   with a colored, de-duplicating terminal sink

pub mod warning;

pub use warning::{DiagnosticSink, Diagnostics, IgnoreWarnings, StderrSink, Warning};
