//! Leading syntax elements of H.264 parameter sets, slice headers and
//! access unit delimiters.
//!
//! Only the first few fields of each structure are read. Values are reported
//! as found and never validated against each other.

use std::fmt;

use crate::structs::nal_unit::NalUnitType;
use crate::utils::bit_reader::BitReservoir;
use crate::utils::errors::BitReaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpsSummary {
    pub profile_idc: u8,
    /// `constraint_set0_flag` through `constraint_set5_flag` and the two
    /// reserved zero bits, MSB first.
    pub constraint_flags: u8,
    pub level_idc: u8,
    pub seq_parameter_set_id: u32,
}

impl SpsSummary {
    pub fn read(reader: &mut BitReservoir) -> Result<Self, BitReaderError> {
        Ok(Self {
            profile_idc: reader.get_bits(8)? as u8,
            constraint_flags: reader.get_bits(8)? as u8,
            level_idc: reader.get_bits(8)? as u8,
            seq_parameter_set_id: reader.get_ue()?,
        })
    }

    /// `level_idc` as the dotted level number, e.g. `31` -> `3.1`.
    pub fn level(&self) -> f32 {
        self.level_idc as f32 / 10.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpsSummary {
    pub pic_parameter_set_id: u32,
    pub seq_parameter_set_id: u32,
    /// CABAC when set, CAVLC otherwise.
    pub entropy_coding_mode_flag: bool,
}

impl PpsSummary {
    pub fn read(reader: &mut BitReservoir) -> Result<Self, BitReaderError> {
        Ok(Self {
            pic_parameter_set_id: reader.get_ue()?,
            seq_parameter_set_id: reader.get_ue()?,
            entropy_coding_mode_flag: reader.get_bit()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceType {
    P,
    B,
    I,
    Sp,
    Si,
}

impl SliceType {
    /// Maps `slice_type`; values 5..=9 mean every slice of the picture
    /// shares the type.
    pub fn from_ue(value: u32) -> Option<Self> {
        match value % 5 {
            _ if value > 9 => None,
            0 => Some(Self::P),
            1 => Some(Self::B),
            2 => Some(Self::I),
            3 => Some(Self::Sp),
            _ => Some(Self::Si),
        }
    }
}

impl fmt::Display for SliceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(match self {
            Self::P => "P",
            Self::B => "B",
            Self::I => "I",
            Self::Sp => "SP",
            Self::Si => "SI",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSummary {
    pub first_mb_in_slice: u32,
    /// Raw `slice_type` code.
    pub slice_type_value: u32,
    pub slice_type: Option<SliceType>,
    pub pic_parameter_set_id: u32,
}

impl SliceSummary {
    pub fn read(reader: &mut BitReservoir) -> Result<Self, BitReaderError> {
        let first_mb_in_slice = reader.get_ue()?;
        let slice_type_value = reader.get_ue()?;
        let pic_parameter_set_id = reader.get_ue()?;

        Ok(Self {
            first_mb_in_slice,
            slice_type_value,
            slice_type: SliceType::from_ue(slice_type_value),
            pic_parameter_set_id,
        })
    }
}

/// Parsed prefix of a NAL unit's RBSP, keyed by unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalSummary {
    Sps(SpsSummary),
    Pps(PpsSummary),
    Slice(SliceSummary),
    AccessUnitDelimiter { primary_pic_type: u8 },
}

impl NalSummary {
    /// Reads the summary for `nal_unit_type` from `rbsp`, the unit payload
    /// after its header byte with emulation prevention removed.
    pub fn read(nal_unit_type: NalUnitType, rbsp: &[u8]) -> Result<Option<Self>, BitReaderError> {
        let mut reader = BitReservoir::new(rbsp);

        let summary = match nal_unit_type {
            NalUnitType::Sps => Self::Sps(SpsSummary::read(&mut reader)?),
            NalUnitType::Pps => Self::Pps(PpsSummary::read(&mut reader)?),
            t if t.is_slice() => Self::Slice(SliceSummary::read(&mut reader)?),
            NalUnitType::Aud => Self::AccessUnitDelimiter {
                primary_pic_type: reader.get_bits(3)? as u8,
            },
            _ => return Ok(None),
        };

        Ok(Some(summary))
    }
}

impl fmt::Display for NalSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sps(sps) => write!(
                f,
                "profile_idc={} constraints={:#04X} level={:.1} sps_id={}",
                sps.profile_idc,
                sps.constraint_flags,
                sps.level(),
                sps.seq_parameter_set_id
            ),
            Self::Pps(pps) => write!(
                f,
                "pps_id={} sps_id={} entropy={}",
                pps.pic_parameter_set_id,
                pps.seq_parameter_set_id,
                if pps.entropy_coding_mode_flag { "CABAC" } else { "CAVLC" }
            ),
            Self::Slice(slice) => {
                write!(f, "first_mb={} slice_type=", slice.first_mb_in_slice)?;
                match slice.slice_type {
                    Some(t) => write!(f, "{t}")?,
                    None => write!(f, "?{}", slice.slice_type_value)?,
                }
                write!(f, " pps_id={}", slice.pic_parameter_set_id)
            }
            Self::AccessUnitDelimiter { primary_pic_type } => {
                write!(f, "primary_pic_type={primary_pic_type}")
            }
        }
    }
}
