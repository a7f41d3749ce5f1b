//! Testing utilities for cancellable promises.
//!
//! This module provides:
//! - A recording transport that captures aborted requests
//! - Cascade members that count or ignore cancellations

mod mocks;

pub use mocks::{CountingCancellable, InertCancellable, RecordingTransport};
