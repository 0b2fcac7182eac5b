/// Annex-B NAL unit extraction.
///
/// Provides the [`NalExtractor`](annexb::NalExtractor) for splitting an H.264
/// byte stream into [`NalUnit`](crate::structs::nal_unit::NalUnit) descriptors
/// at its start codes.
pub mod annexb;

/// ADTS frame extraction.
///
/// Provides the [`AdtsExtractor`](adts::AdtsExtractor) for locating syncwords
/// and emitting one [`AdtsFrame`](crate::structs::adts::AdtsFrame) per
/// `aac_frame_length`.
pub mod adts;

/// SPS, PPS, SEI, IDR slice, access unit delimiter and P slice.
pub const EXAMPLE_H264: &[u8] = &[
    0x00, 0x00, 0x00, 0x01, 0x67, 0x64, 0x00, 0x1F, 0xAC, 0xD9, 0x40, 0x50, 0x05, 0xBB, 0x01, 0x10,
    0x00, 0x00, 0x03, 0x00, 0x10, 0x00, 0x00, 0x03, 0x03, 0xC0, 0xF1, 0x83, 0x19, 0x60, 0x00, 0x00,
    0x00, 0x01, 0x68, 0xEB, 0xE3, 0xCB, 0x22, 0xC0, 0x00, 0x00, 0x01, 0x06, 0x05, 0x04, 0xDE, 0xAD,
    0xBE, 0xEF, 0x80, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84, 0x00, 0x33, 0xFF, 0xFE, 0xF6, 0xF0, 0xFE,
    0x05, 0x36, 0x56, 0x04, 0x50, 0x00, 0x00, 0x01, 0x09, 0x30, 0x00, 0x00, 0x01, 0x41, 0x9A, 0x02,
    0x04, 0x5F, 0xA8, 0x60, 0x0C,
];

/// Three AAC LC stereo 44.1 kHz frames of 16, 12 and 10 bytes.
pub const EXAMPLE_ADTS: &[u8] = &[
    0xFF, 0xF1, 0x50, 0x80, 0x02, 0x1F, 0xFC, 0x21, 0x10, 0x04, 0x60, 0x8C, 0x1C, 0x00, 0x00, 0x07,
    0xFF, 0xF1, 0x50, 0x80, 0x01, 0x9F, 0xFC, 0x21, 0x10, 0x04, 0x60, 0x8C, 0xFF, 0xF1, 0x50, 0x80,
    0x01, 0x5F, 0xFC, 0x21, 0x10, 0x07,
];
