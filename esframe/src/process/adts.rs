use std::iter::FusedIterator;

use log::Level::{Info, Warn};
use log::{debug, trace};

use crate::log_or_err;
use crate::structs::adts::{ADTS_HEADER_LEN, ADTS_HEADER_LEN_CRC, AdtsFrame};
use crate::utils::errors::{HeaderError, ScanError};
use crate::utils::markers::find_sync;
use crate::utils::scan_window::{ByteSource, ScanWindow};

/// Default scan window capacity for ADTS streams.
pub const DEFAULT_ADTS_WINDOW: usize = 10 * 1024;

/// Smallest window able to hold a protected header.
pub const MIN_ADTS_WINDOW: usize = ADTS_HEADER_LEN_CRC;

/// Splits an ADTS byte stream into frames.
///
/// Frames are found by syncword and delimited by `aac_frame_length`: after a
/// frame at offset `n` the search resumes at `n + frame_length`. Headers
/// claiming a length shorter than themselves are treated as false syncs.
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
///
/// use esframe::process::EXAMPLE_ADTS;
/// use esframe::process::adts::AdtsExtractor;
///
/// let mut extractor = AdtsExtractor::new(Cursor::new(EXAMPLE_ADTS));
/// while let Some(frame) = extractor.produce_next_frame()? {
///     assert_eq!(frame.sample_rate(), Some(44100));
///     assert_eq!(frame.channel_configuration.to_string(), "2");
/// }
/// assert_eq!(extractor.frames_produced(), 3);
/// # Ok::<(), esframe::utils::errors::ScanError>(())
/// ```
#[derive(Debug)]
pub struct AdtsExtractor<S> {
    source: S,
    window: ScanWindow,
    index: usize,
    saw_sync: bool,
    finished: bool,
    fail_level: log::Level,
}

impl<S: ByteSource> AdtsExtractor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            window: ScanWindow::new(DEFAULT_ADTS_WINDOW),
            index: 0,
            saw_sync: false,
            finished: false,
            fail_level: log::Level::Error,
        }
    }

    /// Uses a scan window of `capacity` bytes instead of the default.
    pub fn with_capacity(source: S, capacity: usize) -> Result<Self, ScanError> {
        if capacity < MIN_ADTS_WINDOW {
            return Err(ScanError::WindowTooSmall {
                min: MIN_ADTS_WINDOW,
                actual: capacity,
            });
        }

        Ok(Self {
            window: ScanWindow::new(capacity),
            ..Self::new(source)
        })
    }

    pub fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }

    pub fn window_capacity(&self) -> usize {
        self.window.capacity()
    }

    pub fn frames_produced(&self) -> usize {
        self.index
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Produces the next frame, or `None` once the stream is exhausted.
    pub fn produce_next_frame(&mut self) -> Result<Option<AdtsFrame>, ScanError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let Some(pos) = find_sync(self.window.bytes()) else {
                if self.window.is_final() {
                    return self.end_of_stream();
                }

                // the last byte may be the first half of a syncword
                let scanned = self.window.bytes().len();
                self.window.consume(scanned.saturating_sub(1));
                self.window.fill(&mut self.source)?;
                continue;
            };

            self.saw_sync = true;
            self.window.consume(pos);
            let sync_offset = self.window.start_offset();
            let header = self.window.bytes();

            let needed = if header[1] & 0x01 != 0 {
                ADTS_HEADER_LEN
            } else {
                ADTS_HEADER_LEN_CRC
            };
            if header.len() < needed && !self.window.is_final() {
                self.window.fill(&mut self.source)?;
                continue;
            }

            let Some(mut frame) = AdtsFrame::from_header_bytes(header) else {
                return self.end_of_stream();
            };

            let frame_length = frame.frame_length;
            let header_len = frame.header_len();
            if (frame_length as usize) < header_len {
                self.window.consume(1);
                log_or_err!(
                    self,
                    Warn,
                    HeaderError::FrameLengthTooShort {
                        offset: sync_offset,
                        frame_length,
                        header_len,
                    }
                );
                continue;
            }

            frame.index = self.index;
            frame.offset = sync_offset;
            self.index += 1;

            trace!(
                "ADTS frame {} at offset {}: {} bytes",
                frame.index, frame.offset, frame.frame_length
            );

            let missing = self.skip_frame(frame_length as u64)?;
            if missing > 0 {
                log_or_err!(
                    self,
                    Warn,
                    HeaderError::TruncatedFrame {
                        index: frame.index,
                        offset: sync_offset,
                        missing,
                    }
                );
            }

            if frame.sampling_frequency.is_reserved() {
                log_or_err!(
                    self,
                    Info,
                    HeaderError::ReservedSamplingFrequency {
                        index: frame.index,
                        offset: sync_offset,
                        value: frame.sampling_frequency.index(),
                    }
                );
            }

            return Ok(Some(frame));
        }
    }

    /// Consumes `frame_length` bytes from the sync at the front of the
    /// window, returning how many bytes short of the frame end the stream
    /// ends.
    fn skip_frame(&mut self, frame_length: u64) -> Result<u64, ScanError> {
        let mut remaining = frame_length;
        loop {
            let available = self.window.bytes().len() as u64;
            if available >= remaining {
                self.window.consume(remaining as usize);
                return Ok(0);
            }

            self.window.consume(available as usize);
            remaining -= available;

            if self.window.is_final() {
                return Ok(remaining);
            }
            self.window.fill(&mut self.source)?;
        }
    }

    fn end_of_stream(&mut self) -> Result<Option<AdtsFrame>, ScanError> {
        self.finished = true;

        if self.index > 0 || self.saw_sync {
            debug!(
                "ADTS stream ended at offset {} after {} frames",
                self.window.end_offset(),
                self.index
            );
            return Ok(None);
        }

        let end = self.window.end_offset();
        if end < ADTS_HEADER_LEN as u64 {
            let error = ScanError::TruncatedStream(end as usize);
            debug!("{error}");
            return Ok(None);
        }

        debug!("Scanned {end} bytes without an ADTS syncword");
        Err(ScanError::NoSyncWord)
    }
}

impl<S: ByteSource> Iterator for AdtsExtractor<S> {
    type Item = Result<AdtsFrame, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.produce_next_frame().transpose();
        if matches!(item, Some(Err(_))) {
            self.finished = true;
        }

        item
    }
}

impl<S: ByteSource> FusedIterator for AdtsExtractor<S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::adts::{MpegId, Profile, SamplingFrequency};
    use bitstream_io::{BigEndian, BitWrite, BitWriter};
    use quickcheck_macros::quickcheck;
    use std::io::Cursor;

    /// Frames of `data`, with a stream lacking any syncword read as empty.
    fn extract(data: &[u8], capacity: usize) -> Vec<AdtsFrame> {
        match outcome(data, capacity) {
            Ok(frames) => frames,
            Err(error) if error == ScanError::NoSyncWord.to_string() => Vec::new(),
            Err(error) => panic!("{error}"),
        }
    }

    fn outcome(data: &[u8], capacity: usize) -> Result<Vec<AdtsFrame>, String> {
        AdtsExtractor::with_capacity(Cursor::new(data), capacity)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| error.to_string())
    }

    /// Builds an unprotected LC header for a frame of `frame_length` bytes.
    fn header(frame_length: u16, sf_index: u8, channels: u8) -> Vec<u8> {
        let mut writer = BitWriter::endian(Vec::new(), BigEndian);
        writer.write_unsigned_var(12, 0xFFFu16).unwrap();
        writer.write_bit(false).unwrap(); // MPEG-4
        writer.write_unsigned_var(2, 0u8).unwrap();
        writer.write_bit(true).unwrap(); // protection_absent
        writer.write_unsigned_var(2, 1u8).unwrap(); // LC
        writer.write_unsigned_var(4, sf_index).unwrap();
        writer.write_bit(false).unwrap();
        writer.write_unsigned_var(3, channels).unwrap();
        writer.write_unsigned_var(4, 0u8).unwrap();
        writer.write_unsigned_var(13, frame_length).unwrap();
        writer.write_unsigned_var(11, 0x7FFu16).unwrap();
        writer.write_unsigned_var(2, 0u8).unwrap();
        writer.into_writer()
    }

    /// Frame of `frame_length` bytes whose payload holds no syncword.
    fn frame(frame_length: u16) -> Vec<u8> {
        let mut bytes = header(frame_length, 4, 2);
        bytes.resize(frame_length as usize, 0x21);
        bytes
    }

    #[test]
    fn frames_follow_frame_length() {
        let mut data = frame(16);
        data.extend(frame(32));
        data.extend(frame(7));

        let frames = extract(&data, DEFAULT_ADTS_WINDOW);
        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames.iter().map(|f| f.offset).collect::<Vec<_>>(),
            [0, 16, 48]
        );
        assert_eq!(frames[1].frame_length, 32);
        assert_eq!(frames[1].payload_len(), 25);
        assert_eq!(frames[2].index, 2);

        let first = &frames[0];
        assert_eq!(first.mpeg_id, MpegId::Mpeg4);
        assert_eq!(first.profile, Profile::LowComplexity);
        assert_eq!(first.sampling_frequency, SamplingFrequency::F44100);
        assert_eq!(first.channel_configuration.0, 2);
    }

    #[test]
    fn known_header_bytes() {
        let mut data = vec![0xFF, 0xF1, 0x50, 0x80, 0x02, 0x1F, 0xFC];
        data.resize(16, 0x00);

        let frames = extract(&data, MIN_ADTS_WINDOW);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_length, 16);
        assert_eq!(frames[0].to_header_bytes().unwrap(), data[..7]);
    }

    #[test]
    fn garbage_between_frames_is_skipped() {
        let mut data = vec![0x12, 0x34, 0xF0];
        data.extend(frame(20));
        data.extend([0xFF, 0x00, 0x55]);
        data.extend(frame(10));

        let frames = extract(&data, 9);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].offset, 3);
        assert_eq!(frames[1].offset, 26);
    }

    #[test]
    fn false_sync_does_not_stall() {
        // frame_length 3 is shorter than the header
        let mut data = header(3, 4, 2);
        data.extend(frame(12));

        let frames = extract(&data, DEFAULT_ADTS_WINDOW);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].offset, 7);

        let mut strict = AdtsExtractor::new(Cursor::new(data));
        strict.set_fail_level(log::Level::Warn);
        assert!(matches!(
            strict.next(),
            Some(Err(ScanError::Header(HeaderError::FrameLengthTooShort {
                offset: 0,
                frame_length: 3,
                header_len: 7,
            })))
        ));
        assert!(strict.next().is_none());
    }

    #[test]
    fn truncated_last_frame_is_emitted() {
        let mut data = frame(16);
        data.extend(&frame(40)[..20]);

        for capacity in [9, 12, DEFAULT_ADTS_WINDOW] {
            let frames = extract(&data, capacity);
            assert_eq!(frames.len(), 2);
            assert_eq!(frames[1].frame_length, 40);
        }

        let mut strict = AdtsExtractor::new(Cursor::new(data));
        strict.set_fail_level(log::Level::Warn);
        assert!(strict.next().unwrap().is_ok());
        assert!(matches!(
            strict.next(),
            Some(Err(ScanError::Header(HeaderError::TruncatedFrame {
                index: 1,
                offset: 16,
                missing: 20,
            })))
        ));
    }

    #[test]
    fn header_cut_by_end_of_stream() {
        let mut data = frame(16);
        data.extend([0xFF, 0xF1, 0x50]);

        let frames = extract(&data, 9);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn reserved_frequency_is_reported_as_is() {
        let mut data = header(9, 13, 1);
        data.resize(9, 0x21);

        let frames = extract(&data, 16);
        assert_eq!(frames[0].sampling_frequency, SamplingFrequency::Reserved1);
        assert_eq!(frames[0].sample_rate(), None);

        // fails only when the fail level reaches info
        let mut strict = AdtsExtractor::new(Cursor::new(data.clone()));
        strict.set_fail_level(log::Level::Warn);
        assert!(strict.next().unwrap().is_ok());

        let mut pedantic = AdtsExtractor::new(Cursor::new(data));
        pedantic.set_fail_level(log::Level::Info);
        assert!(matches!(
            pedantic.next(),
            Some(Err(ScanError::Header(
                HeaderError::ReservedSamplingFrequency { value: 13, .. }
            )))
        ));
    }

    #[test]
    fn missing_syncword() {
        let mut extractor = AdtsExtractor::new(Cursor::new(vec![0x11u8; 100]));
        assert!(matches!(extractor.next(), Some(Err(ScanError::NoSyncWord))));
        assert!(extractor.next().is_none());

        let mut extractor = AdtsExtractor::new(Cursor::new(vec![0xFFu8, 0xF1]));
        assert!(extractor.next().is_none());

        assert!(matches!(
            AdtsExtractor::with_capacity(Cursor::new(Vec::<u8>::new()), 8),
            Err(ScanError::WindowTooSmall { min: 9, actual: 8 })
        ));
    }

    #[test]
    fn noise_only_streams_agree_across_windows() {
        for len in [0, 6, 7, 9, 40] {
            let data = vec![0x00u8; len];
            for capacity in [MIN_ADTS_WINDOW, 10, DEFAULT_ADTS_WINDOW] {
                let result = outcome(&data, capacity);
                if len < ADTS_HEADER_LEN {
                    assert_eq!(result, Ok(Vec::new()));
                } else {
                    assert_eq!(result, Err(ScanError::NoSyncWord.to_string()));
                }
                assert!(extract(&data, capacity).is_empty());
            }
        }
    }

    /// Counts the bytes pulled from the wrapped reader.
    struct CountingReader<R> {
        inner: R,
        read: usize,
    }

    impl<R: std::io::Read> std::io::Read for CountingReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.read += n;
            Ok(n)
        }
    }

    #[test]
    fn each_stream_byte_is_read_once() {
        let data: Vec<u8> = (0..500).flat_map(|_| frame(50)).collect();

        for capacity in [MIN_ADTS_WINDOW, 64, DEFAULT_ADTS_WINDOW] {
            let source = CountingReader {
                inner: Cursor::new(&data[..]),
                read: 0,
            };
            let mut extractor = AdtsExtractor::with_capacity(source, capacity).unwrap();

            assert_eq!(extractor.by_ref().filter(Result::is_ok).count(), 500);
            assert_eq!(extractor.into_inner().read, data.len());
        }
    }

    #[test]
    fn example_stream() {
        let frames = extract(crate::process::EXAMPLE_ADTS, DEFAULT_ADTS_WINDOW);
        assert_eq!(frames.len(), 3);

        for capacity in [9, 10, 17, 64] {
            assert_eq!(extract(crate::process::EXAMPLE_ADTS, capacity), frames);
        }
    }

    #[quickcheck]
    fn window_capacity_does_not_change_frames(
        lengths: Vec<u16>,
        noise: Vec<u8>,
        capacity: u8,
    ) -> bool {
        let mut data = noise.iter().map(|&b| b & 0x7F).collect::<Vec<_>>();
        for length in lengths.iter().take(16) {
            // lengths below 7 leave cut-off headers between the real frames
            data.extend(frame(3 + length % 256));
        }
        let capacity = MIN_ADTS_WINDOW + capacity as usize % 48;

        outcome(&data, capacity) == outcome(&data, DEFAULT_ADTS_WINDOW)
    }
}
