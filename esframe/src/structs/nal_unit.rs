//! Annex-B NAL units and their one-byte header.
//!
//! ```text
//! +---------------+
//! |0|1|2|3|4|5|6|7|
//! +-+-+-+-+-+-+-+-+
//! |F|NRI|  Type   |
//! +---------------+
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::structs::syntax::NalSummary;
use crate::utils::errors::BitReaderError;

/// `nal_unit_type`, the low five bits of the header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    /// 0 and 24..=31.
    Unspecified(u8),
    Slice,
    PartitionA,
    PartitionB,
    PartitionC,
    IdrSlice,
    Sei,
    Sps,
    Pps,
    Aud,
    EndOfSequence,
    EndOfStream,
    Filler,
    SpsExtension,
    PrefixNal,
    SubsetSps,
    DepthParameterSet,
    AuxiliarySlice,
    SliceExtension,
    DepthSliceExtension,
    /// 17, 18, 22 and 23.
    Reserved(u8),
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value & 0x1F {
            1 => Self::Slice,
            2 => Self::PartitionA,
            3 => Self::PartitionB,
            4 => Self::PartitionC,
            5 => Self::IdrSlice,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::Filler,
            13 => Self::SpsExtension,
            14 => Self::PrefixNal,
            15 => Self::SubsetSps,
            16 => Self::DepthParameterSet,
            19 => Self::AuxiliarySlice,
            20 => Self::SliceExtension,
            21 => Self::DepthSliceExtension,
            v @ (17 | 18 | 22 | 23) => Self::Reserved(v),
            v => Self::Unspecified(v),
        }
    }
}

impl NalUnitType {
    pub fn value(self) -> u8 {
        match self {
            Self::Unspecified(v) | Self::Reserved(v) => v,
            Self::Slice => 1,
            Self::PartitionA => 2,
            Self::PartitionB => 3,
            Self::PartitionC => 4,
            Self::IdrSlice => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::Filler => 12,
            Self::SpsExtension => 13,
            Self::PrefixNal => 14,
            Self::SubsetSps => 15,
            Self::DepthParameterSet => 16,
            Self::AuxiliarySlice => 19,
            Self::SliceExtension => 20,
            Self::DepthSliceExtension => 21,
        }
    }

    /// Coded slices whose header starts with `first_mb_in_slice`.
    pub fn is_slice(self) -> bool {
        matches!(self, Self::Slice | Self::IdrSlice | Self::AuxiliarySlice)
    }

    /// IDR slices and parameter sets, the units a decoder can start from.
    pub fn is_keyframe(self) -> bool {
        matches!(self, Self::IdrSlice | Self::Sps | Self::Pps)
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Unspecified(0) => "UNKNOWN",
            Self::Unspecified(_) => "UNSPEC",
            Self::Slice => "SLICE",
            Self::PartitionA => "DPA",
            Self::PartitionB => "DPB",
            Self::PartitionC => "DPC",
            Self::IdrSlice => "IDR",
            Self::Sei => "SEI",
            Self::Sps => "SPS",
            Self::Pps => "PPS",
            Self::Aud => "AUD",
            Self::EndOfSequence => "EOSEQ",
            Self::EndOfStream => "EOSTREAM",
            Self::Filler => "FILL",
            Self::SpsExtension => "SPSEXT",
            Self::PrefixNal => "PREFIX",
            Self::SubsetSps => "SUBSPS",
            Self::DepthParameterSet => "DPS",
            Self::AuxiliarySlice => "AUX",
            Self::SliceExtension => "SLCEXT",
            Self::DepthSliceExtension => "SLC3D",
            Self::Reserved(_) => "RSV",
        };

        f.pad(name)
    }
}

/// `nal_ref_idc`: how much the decoder needs this unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NalRefIdc {
    Disposable = 0,
    Low = 1,
    High = 2,
    Highest = 3,
}

impl From<u8> for NalRefIdc {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Disposable,
            1 => Self::Low,
            2 => Self::High,
            _ => Self::Highest,
        }
    }
}

impl fmt::Display for NalRefIdc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(match self {
            Self::Disposable => "DISPOS",
            Self::Low => "LOW",
            Self::High => "HIGH",
            Self::Highest => "HIGHEST",
        })
    }
}

/// Decoded NAL unit header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    pub forbidden_bit: bool,
    pub nal_ref_idc: NalRefIdc,
    pub nal_unit_type: NalUnitType,
}

impl NalHeader {
    pub fn from_byte(b: u8) -> Self {
        Self {
            forbidden_bit: (b & 0x80) != 0,
            nal_ref_idc: NalRefIdc::from((b & 0x60) >> 5),
            nal_unit_type: NalUnitType::from(b & 0x1F),
        }
    }

    pub fn to_byte(self) -> u8 {
        ((self.forbidden_bit as u8) << 7)
            | ((self.nal_ref_idc as u8) << 5)
            | self.nal_unit_type.value()
    }
}

/// One Annex-B unit located by [`NalExtractor`](crate::process::annexb::NalExtractor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalUnit {
    /// Ordinal of the unit within the stream.
    pub index: usize,
    /// Stream offset of the first start code byte.
    pub offset: u64,
    /// 3 or 4.
    pub start_code_len: u8,
    /// Decoded from the first payload byte. An empty unit carries the
    /// all-zero header.
    pub header: NalHeader,
    /// Unit bytes after the start code, header byte included.
    pub payload: Vec<u8>,
}

impl NalUnit {
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Start code plus payload.
    pub fn total_len(&self) -> usize {
        self.start_code_len as usize + self.payload.len()
    }

    pub fn forbidden_bit(&self) -> bool {
        self.header.forbidden_bit
    }

    pub fn nal_ref_idc(&self) -> NalRefIdc {
        self.header.nal_ref_idc
    }

    pub fn nal_unit_type(&self) -> NalUnitType {
        self.header.nal_unit_type
    }

    /// Payload after the header byte with emulation prevention removed.
    pub fn rbsp(&self) -> Cow<'_, [u8]> {
        to_rbsp(self.payload.get(1..).unwrap_or_default())
    }

    /// Leading syntax elements of parameter sets, slices and delimiters.
    ///
    /// `Ok(None)` for unit types without a summary.
    pub fn summary(&self) -> Result<Option<NalSummary>, BitReaderError> {
        NalSummary::read(self.nal_unit_type(), &self.rbsp())
    }
}

/// Strips emulation prevention bytes: every `00 00 03` becomes `00 00`.
///
/// Borrows the input when there is nothing to strip.
pub fn to_rbsp(payload: &[u8]) -> Cow<'_, [u8]> {
    let has_epb = payload.windows(3).any(|w| w == [0x00, 0x00, 0x03]);
    if !has_epb {
        return Cow::Borrowed(payload);
    }

    let mut rbsp = Vec::with_capacity(payload.len());
    let mut zeros = 0;
    for &byte in payload {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }

        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
        rbsp.push(byte);
    }

    Cow::Owned(rbsp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields_are_shifted_down() {
        let header = NalHeader::from_byte(0x67);
        assert!(!header.forbidden_bit);
        assert_eq!(header.nal_ref_idc, NalRefIdc::Highest);
        assert_eq!(header.nal_unit_type, NalUnitType::Sps);

        let header = NalHeader::from_byte(0x41);
        assert_eq!(header.nal_ref_idc, NalRefIdc::High);
        assert_eq!(header.nal_unit_type, NalUnitType::Slice);

        let header = NalHeader::from_byte(0x86);
        assert!(header.forbidden_bit);
        assert_eq!(header.nal_ref_idc, NalRefIdc::Disposable);
        assert_eq!(header.nal_unit_type, NalUnitType::Sei);
    }

    #[test]
    fn header_round_trips_every_byte() {
        for b in 0..=u8::MAX {
            assert_eq!(NalHeader::from_byte(b).to_byte(), b);
        }
    }

    #[test]
    fn unit_type_names() {
        assert_eq!(NalUnitType::from(0).to_string(), "UNKNOWN");
        assert_eq!(NalUnitType::from(5).to_string(), "IDR");
        assert_eq!(NalUnitType::from(12).to_string(), "FILL");
        assert_eq!(NalUnitType::from(18), NalUnitType::Reserved(18));
        assert_eq!(NalUnitType::from(30), NalUnitType::Unspecified(30));
        assert_eq!(format!("{:>6}", NalRefIdc::Low), "   LOW");
    }

    #[test]
    fn emulation_prevention_is_removed() {
        assert!(matches!(to_rbsp(&[0x00, 0x01, 0x02]), Cow::Borrowed(_)));
        assert_eq!(&*to_rbsp(&[0x00, 0x00, 0x03, 0x01]), &[0x00, 0x00, 0x01]);
        assert_eq!(
            &*to_rbsp(&[0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x02]),
            &[0x00, 0x00, 0x00, 0x00, 0x02]
        );
        // a 03 that does not follow two zeros stays
        assert_eq!(
            &*to_rbsp(&[0x03, 0x00, 0x03, 0x00, 0x00, 0x03]),
            &[0x03, 0x00, 0x03, 0x00, 0x00]
        );
    }
}
