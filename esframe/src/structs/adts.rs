//! ADTS frame headers.
//!
//! ## Layout
//!
//! ```text
//! adts_fixed_header                    adts_variable_header
//!   syncword                  12         copyright_identification_bit    1
//!   ID                         1         copyright_identification_start  1
//!   layer                      2         aac_frame_length               13
//!   protection_absent          1         adts_buffer_fullness           11
//!   profile                    2         number_of_raw_data_blocks       2
//!   sampling_frequency_index   4
//!   private_bit                1       adts_error_check (protection_absent == 0)
//!   channel_configuration      3         crc_check                      16
//!   original_copy              1
//!   home                       1
//! ```
//!
//! Every raw data block carries 1024 samples per channel.

use std::fmt;
use std::io;
use std::time::Duration;

use bitstream_io::{BigEndian, BitWrite, BitWriter};

use crate::utils::markers::{ADTS_SYNCWORD, is_syncword};

/// Header length without `crc_check`.
pub const ADTS_HEADER_LEN: usize = 7;

/// Header length with `crc_check`.
pub const ADTS_HEADER_LEN_CRC: usize = 9;

/// Samples per channel in one raw data block.
pub const SAMPLES_PER_RAW_DATA_BLOCK: u32 = 1024;

/// `adts_buffer_fullness` value signalling a variable bit rate stream.
pub const BUFFER_FULLNESS_VBR: u16 = 0x7FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegId {
    Mpeg4,
    Mpeg2,
}

impl From<bool> for MpegId {
    fn from(bit: bool) -> Self {
        if bit { Self::Mpeg2 } else { Self::Mpeg4 }
    }
}

impl fmt::Display for MpegId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(match self {
            Self::Mpeg4 => "MPEG-4",
            Self::Mpeg2 => "MPEG-2",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Main = 0,
    LowComplexity = 1,
    ScalableSamplingRate = 2,
    Reserved = 3,
}

impl From<u8> for Profile {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Main,
            1 => Self::LowComplexity,
            2 => Self::ScalableSamplingRate,
            _ => Self::Reserved,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(match self {
            Self::Main => "AAC Main",
            Self::LowComplexity => "AAC LC",
            Self::ScalableSamplingRate => "AAC SSR",
            Self::Reserved => "Reserved",
        })
    }
}

/// `sampling_frequency_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingFrequency {
    F96000 = 0,
    F88200 = 1,
    F64000 = 2,
    F48000 = 3,
    F44100 = 4,
    F32000 = 5,
    F24000 = 6,
    F22050 = 7,
    F16000 = 8,
    F12000 = 9,
    F11025 = 10,
    F8000 = 11,
    F7350 = 12,
    Reserved1 = 13,
    Reserved2 = 14,
    /// Rate carried explicitly elsewhere; never valid in ADTS.
    Escape = 15,
}

impl From<u8> for SamplingFrequency {
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0 => Self::F96000,
            1 => Self::F88200,
            2 => Self::F64000,
            3 => Self::F48000,
            4 => Self::F44100,
            5 => Self::F32000,
            6 => Self::F24000,
            7 => Self::F22050,
            8 => Self::F16000,
            9 => Self::F12000,
            10 => Self::F11025,
            11 => Self::F8000,
            12 => Self::F7350,
            13 => Self::Reserved1,
            14 => Self::Reserved2,
            _ => Self::Escape,
        }
    }
}

impl SamplingFrequency {
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn hz(self) -> Option<u32> {
        Some(match self {
            Self::F96000 => 96000,
            Self::F88200 => 88200,
            Self::F64000 => 64000,
            Self::F48000 => 48000,
            Self::F44100 => 44100,
            Self::F32000 => 32000,
            Self::F24000 => 24000,
            Self::F22050 => 22050,
            Self::F16000 => 16000,
            Self::F12000 => 12000,
            Self::F11025 => 11025,
            Self::F8000 => 8000,
            Self::F7350 => 7350,
            Self::Reserved1 | Self::Reserved2 | Self::Escape => return None,
        })
    }

    pub fn is_reserved(self) -> bool {
        self.hz().is_none()
    }
}

impl fmt::Display for SamplingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self, self.hz()) {
            (_, Some(hz)) => f.pad(&hz.to_string()),
            (Self::Reserved1, None) => f.pad("Reserved1"),
            (Self::Reserved2, None) => f.pad("Reserved2"),
            (_, None) => f.pad("escape value"),
        }
    }
}

/// `channel_configuration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfiguration(pub u8);

impl ChannelConfiguration {
    /// Output channel count, `None` when the layout is signalled in-band.
    pub fn channels(self) -> Option<u8> {
        match self.0 {
            0 => None,
            1..=6 => Some(self.0),
            _ => Some(8),
        }
    }
}

impl fmt::Display for ChannelConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            6 => f.pad("5+1"),
            7 => f.pad("7+1"),
            n => f.pad(&n.to_string()),
        }
    }
}

/// One frame located by [`AdtsExtractor`](crate::process::adts::AdtsExtractor).
///
/// All header fields are stored shifted down to their own width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdtsFrame {
    /// Ordinal of the frame within the stream.
    pub index: usize,
    /// Stream offset of the syncword.
    pub offset: u64,

    pub mpeg_id: MpegId,
    pub layer: u8,
    pub protection_absent: bool,
    pub profile: Profile,
    pub sampling_frequency: SamplingFrequency,
    pub private_bit: bool,
    pub channel_configuration: ChannelConfiguration,
    pub original_copy: bool,
    pub home: bool,

    pub copyright_id_bit: bool,
    pub copyright_id_start: bool,
    /// Total frame length in bytes, header included.
    pub frame_length: u16,
    pub buffer_fullness: u16,
    /// Stored value; the frame carries one more raw data block than this.
    pub num_raw_data_blocks: u8,

    /// Present when `protection_absent` is clear and both bytes were read.
    pub crc_check: Option<u16>,
}

impl AdtsFrame {
    /// Decodes the header at the start of `bytes`.
    ///
    /// `None` when `bytes` is shorter than 7 bytes or does not begin with the
    /// syncword. `index` and `offset` are left at zero for the caller to set.
    ///
    /// ```rust
    /// use esframe::structs::adts::{AdtsFrame, MpegId, Profile};
    ///
    /// let frame = AdtsFrame::from_header_bytes(&[0xFF, 0xF1, 0x50, 0x80, 0x02, 0x1F, 0xFC]).unwrap();
    /// assert_eq!(frame.mpeg_id, MpegId::Mpeg4);
    /// assert_eq!(frame.profile, Profile::LowComplexity);
    /// assert_eq!(frame.channel_configuration.0, 2);
    /// assert_eq!(frame.frame_length, 16);
    /// ```
    pub fn from_header_bytes(bytes: &[u8]) -> Option<Self> {
        let &[b0, b1, b2, b3, b4, b5, b6, ..] = bytes else {
            return None;
        };

        if !is_syncword(b0, b1) {
            return None;
        }

        let protection_absent = (b1 & 0x01) != 0;
        let crc_check = match (protection_absent, bytes.get(7..9)) {
            (false, Some(crc)) => Some(u16::from_be_bytes([crc[0], crc[1]])),
            _ => None,
        };

        Some(Self {
            index: 0,
            offset: 0,

            mpeg_id: MpegId::from((b1 & 0x08) != 0),
            layer: (b1 & 0x06) >> 1,
            protection_absent,
            profile: Profile::from((b2 & 0xC0) >> 6),
            sampling_frequency: SamplingFrequency::from((b2 & 0x3C) >> 2),
            private_bit: (b2 & 0x02) != 0,
            channel_configuration: ChannelConfiguration(((b2 & 0x01) << 2) | ((b3 & 0xC0) >> 6)),
            original_copy: (b3 & 0x20) != 0,
            home: (b3 & 0x10) != 0,

            copyright_id_bit: (b3 & 0x08) != 0,
            copyright_id_start: (b3 & 0x04) != 0,
            frame_length: (((b3 & 0x03) as u16) << 11)
                | ((b4 as u16) << 3)
                | (((b5 & 0xE0) as u16) >> 5),
            buffer_fullness: (((b5 & 0x1F) as u16) << 6) | (((b6 & 0xFC) as u16) >> 2),
            num_raw_data_blocks: b6 & 0x03,

            crc_check,
        })
    }

    /// Serializes the header, 7 bytes or 9 with `crc_check`.
    ///
    /// A protected frame without a stored checksum is written with zero.
    pub fn to_header_bytes(&self) -> io::Result<Vec<u8>> {
        let mut writer = BitWriter::endian(Vec::with_capacity(self.header_len()), BigEndian);

        writer.write_unsigned_var(12, ADTS_SYNCWORD)?;
        writer.write_bit(self.mpeg_id == MpegId::Mpeg2)?;
        writer.write_unsigned_var(2, self.layer)?;
        writer.write_bit(self.protection_absent)?;
        writer.write_unsigned_var(2, self.profile as u8)?;
        writer.write_unsigned_var(4, self.sampling_frequency.index())?;
        writer.write_bit(self.private_bit)?;
        writer.write_unsigned_var(3, self.channel_configuration.0)?;
        writer.write_bit(self.original_copy)?;
        writer.write_bit(self.home)?;

        writer.write_bit(self.copyright_id_bit)?;
        writer.write_bit(self.copyright_id_start)?;
        writer.write_unsigned_var(13, self.frame_length)?;
        writer.write_unsigned_var(11, self.buffer_fullness)?;
        writer.write_unsigned_var(2, self.num_raw_data_blocks)?;

        if !self.protection_absent {
            writer.write_unsigned_var(16, self.crc_check.unwrap_or(0))?;
        }

        Ok(writer.into_writer())
    }

    pub fn header_len(&self) -> usize {
        if self.protection_absent {
            ADTS_HEADER_LEN
        } else {
            ADTS_HEADER_LEN_CRC
        }
    }

    /// Bytes after the header.
    pub fn payload_len(&self) -> usize {
        (self.frame_length as usize).saturating_sub(self.header_len())
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sampling_frequency.hz()
    }

    pub fn raw_data_blocks(&self) -> u8 {
        self.num_raw_data_blocks + 1
    }

    /// Samples per channel carried by the frame.
    pub fn samples(&self) -> u32 {
        self.raw_data_blocks() as u32 * SAMPLES_PER_RAW_DATA_BLOCK
    }

    /// Playback time of the frame, `None` for reserved rates.
    pub fn duration(&self) -> Option<Duration> {
        let hz = self.sample_rate()?;
        Some(Duration::from_nanos(
            self.samples() as u64 * 1_000_000_000 / hz as u64,
        ))
    }

    pub fn is_vbr(&self) -> bool {
        self.buffer_fullness == BUFFER_FULLNESS_VBR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LC_STEREO: [u8; 7] = [0xFF, 0xF1, 0x50, 0x80, 0x02, 0x1F, 0xFC];

    #[test]
    fn decodes_lc_stereo_header() {
        let frame = AdtsFrame::from_header_bytes(&LC_STEREO).unwrap();

        assert_eq!(frame.mpeg_id, MpegId::Mpeg4);
        assert_eq!(frame.layer, 0);
        assert!(frame.protection_absent);
        assert_eq!(frame.profile, Profile::LowComplexity);
        assert_eq!(frame.sampling_frequency, SamplingFrequency::F44100);
        assert_eq!(frame.sample_rate(), Some(44100));
        assert_eq!(frame.channel_configuration, ChannelConfiguration(2));
        assert_eq!(frame.frame_length, 16);
        assert!(frame.is_vbr());
        assert_eq!(frame.num_raw_data_blocks, 0);
        assert_eq!(frame.crc_check, None);

        assert_eq!(frame.header_len(), 7);
        assert_eq!(frame.payload_len(), 9);
        assert_eq!(frame.samples(), 1024);
        assert_eq!(frame.duration(), Some(Duration::from_nanos(23_219_954)));
    }

    #[test]
    fn rejects_short_or_unsynced_input() {
        assert_eq!(AdtsFrame::from_header_bytes(&LC_STEREO[..6]), None);
        assert_eq!(
            AdtsFrame::from_header_bytes(&[0xFF, 0xE1, 0x50, 0x80, 0x02, 0x1F, 0xFC]),
            None
        );
    }

    #[test]
    fn protected_header_carries_crc() {
        let bytes = [0xFF, 0xF8, 0x4C, 0x80, 0x02, 0x5F, 0xFD, 0xAB, 0xCD];
        let frame = AdtsFrame::from_header_bytes(&bytes).unwrap();

        assert_eq!(frame.mpeg_id, MpegId::Mpeg2);
        assert!(!frame.protection_absent);
        assert_eq!(frame.profile, Profile::LowComplexity);
        assert_eq!(frame.sampling_frequency, SamplingFrequency::F48000);
        assert_eq!(frame.frame_length, 18);
        assert_eq!(frame.raw_data_blocks(), 2);
        assert_eq!(frame.crc_check, Some(0xABCD));
        assert_eq!(frame.header_len(), 9);

        // without the crc bytes the header still decodes
        let frame = AdtsFrame::from_header_bytes(&bytes[..7]).unwrap();
        assert_eq!(frame.crc_check, None);
    }

    #[test]
    fn header_serialization_matches_wire_bytes() {
        let frame = AdtsFrame::from_header_bytes(&LC_STEREO).unwrap();
        assert_eq!(frame.to_header_bytes().unwrap(), LC_STEREO);

        let bytes = [0xFF, 0xF8, 0x4C, 0x80, 0x02, 0x5F, 0xFD, 0xAB, 0xCD];
        let frame = AdtsFrame::from_header_bytes(&bytes).unwrap();
        assert_eq!(frame.to_header_bytes().unwrap(), bytes);
    }

    #[test]
    fn table_labels() {
        assert_eq!(SamplingFrequency::from(0).to_string(), "96000");
        assert_eq!(SamplingFrequency::from(12).to_string(), "7350");
        assert_eq!(SamplingFrequency::from(13).to_string(), "Reserved1");
        assert_eq!(SamplingFrequency::from(14).to_string(), "Reserved2");
        assert_eq!(SamplingFrequency::from(15).to_string(), "escape value");
        assert!(SamplingFrequency::Escape.is_reserved());

        assert_eq!(ChannelConfiguration(0).to_string(), "0");
        assert_eq!(ChannelConfiguration(6).to_string(), "5+1");
        assert_eq!(ChannelConfiguration(7).to_string(), "7+1");
        assert_eq!(ChannelConfiguration(7).channels(), Some(8));

        assert_eq!(Profile::from(3).to_string(), "Reserved");
        assert_eq!(format!("{:>8}", MpegId::Mpeg2), "  MPEG-2");
    }
}
