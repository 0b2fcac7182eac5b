use std::iter::FusedIterator;

use log::Level::Warn;
use log::{debug, trace, warn};

use crate::log_or_err;
use crate::structs::nal_unit::{NalHeader, NalUnit};
use crate::utils::errors::{HeaderError, ScanError};
use crate::utils::markers::{START_CODE_3, START_CODE_4, find_first_start_code};
use crate::utils::scan_window::{ByteSource, ScanWindow};

/// Default scan window capacity for Annex-B streams.
pub const DEFAULT_ANNEXB_WINDOW: usize = 100 * 1024;

/// Smallest window able to hold a four-byte start code.
pub const MIN_ANNEXB_WINDOW: usize = START_CODE_4.len();

/// Splits an Annex-B byte stream into NAL units.
///
/// Each unit spans from its start code up to the next start code or the end
/// of the stream. Units are produced in stream order and the byte ranges they
/// cover are disjoint and contiguous from the first start code onwards.
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
///
/// use esframe::process::EXAMPLE_H264;
/// use esframe::process::annexb::NalExtractor;
/// use esframe::structs::nal_unit::NalUnitType;
///
/// let extractor = NalExtractor::new(Cursor::new(EXAMPLE_H264));
/// let types = extractor
///     .map(|unit| unit.map(|unit| unit.nal_unit_type()))
///     .collect::<Result<Vec<_>, _>>()?;
///
/// assert_eq!(types[0], NalUnitType::Sps);
/// assert_eq!(types[1], NalUnitType::Pps);
/// # Ok::<(), esframe::utils::errors::ScanError>(())
/// ```
#[derive(Debug)]
pub struct NalExtractor<S> {
    source: S,
    window: ScanWindow,
    scratch: Vec<u8>,
    index: usize,
    synced: bool,
    finished: bool,
    fail_level: log::Level,
}

impl<S: ByteSource> NalExtractor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            window: ScanWindow::new(DEFAULT_ANNEXB_WINDOW),
            scratch: Vec::new(),
            index: 0,
            synced: false,
            finished: false,
            fail_level: log::Level::Error,
        }
    }

    /// Uses a scan window of `capacity` bytes instead of the default.
    pub fn with_capacity(source: S, capacity: usize) -> Result<Self, ScanError> {
        if capacity < MIN_ANNEXB_WINDOW {
            return Err(ScanError::WindowTooSmall {
                min: MIN_ANNEXB_WINDOW,
                actual: capacity,
            });
        }

        Ok(Self {
            window: ScanWindow::new(capacity),
            ..Self::new(source)
        })
    }

    /// Header anomalies at or above `level` end the session with an error
    /// instead of being logged.
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }

    pub fn window_capacity(&self) -> usize {
        self.window.capacity()
    }

    /// Units produced so far.
    pub fn units_produced(&self) -> usize {
        self.index
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Produces the next unit, or `None` once the stream is exhausted.
    pub fn produce_next_unit(&mut self) -> Result<Option<NalUnit>, ScanError> {
        if self.finished {
            return Ok(None);
        }

        let Some((offset, start_code_len)) = self.locate_start_code()? else {
            self.finished = true;
            return Ok(None);
        };

        if !self.read_payload(start_code_len as usize)? {
            self.finished = true;
        }

        let payload = std::mem::take(&mut self.scratch);
        let header = payload
            .first()
            .map_or(NalHeader::from_byte(0), |&b| NalHeader::from_byte(b));

        let unit = NalUnit {
            index: self.index,
            offset,
            start_code_len,
            header,
            payload,
        };
        self.index += 1;

        trace!(
            "NAL unit {} at offset {}: {} bytes, type {}",
            unit.index,
            unit.offset,
            unit.total_len(),
            unit.nal_unit_type()
        );

        if unit.payload.is_empty() {
            log_or_err!(
                self,
                Warn,
                HeaderError::EmptyNalUnit {
                    index: unit.index,
                    offset,
                }
            );
        } else if unit.forbidden_bit() {
            log_or_err!(
                self,
                Warn,
                HeaderError::ForbiddenBitSet {
                    index: unit.index,
                    offset,
                }
            );
        }

        Ok(Some(unit))
    }

    /// Finds the start code opening the next unit, returning its stream
    /// offset and length. The window is left positioned at the code.
    ///
    /// After the first unit every call begins exactly at a start code, so
    /// only the first call can skip bytes or run out of stream.
    fn locate_start_code(&mut self) -> Result<Option<(u64, u8)>, ScanError> {
        loop {
            if let Some((pos, len)) = find_first_start_code(self.window.bytes()) {
                let offset = self.window.start_offset() + pos as u64;
                if !self.synced && offset > 0 {
                    warn!("Skipped {offset} bytes before the first start code");
                }
                self.synced = true;
                self.window.consume(pos);

                return Ok(Some((offset, len as u8)));
            }

            if self.window.is_final() {
                return self.end_without_start_code();
            }

            // the last bytes may begin a start code completed by the next fill
            let scanned = self.window.bytes().len();
            self.window.consume(scanned.saturating_sub(START_CODE_3.len()));
            self.window.fill(&mut self.source)?;
        }
    }

    fn end_without_start_code(&mut self) -> Result<Option<(u64, u8)>, ScanError> {
        if self.synced {
            return Ok(None);
        }

        let end = self.window.end_offset();
        if end < MIN_ANNEXB_WINDOW as u64 {
            let error = ScanError::TruncatedStream(end as usize);
            debug!("{error}");
            return Ok(None);
        }

        Err(ScanError::NoStartCode)
    }

    /// Consumes the `start_code_len`-byte start code at the front of the
    /// window, then collects the bytes up to the next start code into the
    /// scratch buffer. The window is left positioned at that code.
    ///
    /// Returns `false` when the payload ran to the end of the stream.
    fn read_payload(&mut self, start_code_len: usize) -> Result<bool, ScanError> {
        self.scratch.clear();
        self.window.consume(start_code_len);

        loop {
            let bytes = self.window.bytes();

            if let Some((pos, _)) = find_first_start_code(bytes) {
                self.scratch.extend_from_slice(&bytes[..pos]);
                self.window.consume(pos);

                return Ok(true);
            }

            if self.window.is_final() {
                let rest = bytes.len();
                self.scratch.extend_from_slice(bytes);
                self.window.consume(rest);

                return Ok(false);
            }

            // a start code may straddle the join with the next fill
            let taken = bytes.len().saturating_sub(START_CODE_3.len());
            self.scratch.extend_from_slice(&bytes[..taken]);
            self.window.consume(taken);
            self.window.fill(&mut self.source)?;
        }
    }
}

impl<S: ByteSource> Iterator for NalExtractor<S> {
    type Item = Result<NalUnit, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.produce_next_unit().transpose();
        if matches!(item, Some(Err(_))) {
            self.finished = true;
        }

        item
    }
}

impl<S: ByteSource> FusedIterator for NalExtractor<S> {}
