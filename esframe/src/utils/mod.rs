//! Utility functions and supporting infrastructure.
//!
//! Provides the bit-level reader, marker search, the refillable scan window
//! and the error types shared by both extractors.

pub mod bit_reader;
pub mod errors;
pub mod markers;
pub mod scan_window;
