//! Data structures representing elementary stream units.
//!
//! Typed descriptors for Annex-B NAL units and ADTS frames, plus the leading
//! syntax elements of H.264 parameter sets and slice headers.

pub mod adts;
pub mod nal_unit;
pub mod syntax;
