#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Framing layer for raw elementary streams. Nothing here decodes audio or
//! video; the crate finds unit boundaries and reads header fields.
//!
//! ### Annex-B (H.264)
//!
//! Units are separated by `00 00 01` or `00 00 00 01` start codes. Each unit
//! opens with a one-byte header carrying `forbidden_zero_bit`,
//! `nal_ref_idc` and `nal_unit_type`.
//!
//! ### ADTS (AAC)
//!
//! Frames open with the 12-bit syncword `0xFFF` followed by a 7-byte header,
//! or 9 bytes when a CRC is present. `aac_frame_length` gives the distance
//! to the next frame.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use esframe::process::annexb::NalExtractor;
//! use esframe::process::EXAMPLE_H264;
//!
//! for unit in NalExtractor::new(Cursor::new(EXAMPLE_H264)) {
//!     let unit = unit?;
//!     println!(
//!         "{:5}| {:8}| {:>7}| {:>6}| {:8}|",
//!         unit.index,
//!         unit.offset,
//!         unit.nal_ref_idc(),
//!         unit.nal_unit_type(),
//!         unit.payload_len()
//!     );
//!
//!     if let Some(summary) = unit.summary()? {
//!         println!("       {summary}");
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Unit extraction from elementary streams.
///
/// 1. **Annex-B** ([`process::annexb`]): start code search and NAL unit
///    segmentation.
///
/// 2. **ADTS** ([`process::adts`]): syncword search and length-directed
///    framing.
pub mod process;

/// Descriptors for the units the extractors produce.
///
/// - **NAL units** ([`structs::nal_unit`]): header byte, payload, RBSP
/// - **ADTS frames** ([`structs::adts`]): fixed and variable header fields
/// - **Syntax** ([`structs::syntax`]): SPS, PPS and slice header prefixes
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bit reader** ([`utils::bit_reader`]): 32-bit reservoir reader
/// - **Markers** ([`utils::markers`]): start code and syncword search
/// - **Scan window** ([`utils::scan_window`]): refillable read window
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;
