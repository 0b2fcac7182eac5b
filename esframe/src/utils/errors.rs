/// Logs `$err` at `$level`, or returns it when `$level` reaches the
/// extractor's fail level.
#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BitReaderError {
    #[error("Requested {requested} bits but only {available} remain")]
    OutOfData { requested: usize, available: usize },

    #[error("Exp-Golomb code has more than 31 leading zero bits")]
    InvalidExpGolomb,
}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("I/O failure while reading the stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream too short to classify a marker ({0} bytes available)")]
    TruncatedStream(usize),

    #[error("No Annex-B start code found in the stream")]
    NoStartCode,

    #[error("No ADTS syncword found in the stream")]
    NoSyncWord,

    #[error("Scan window capacity must be at least {min} bytes, got {actual}")]
    WindowTooSmall { min: usize, actual: usize },

    #[error(transparent)]
    Header(#[from] HeaderError),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("NAL unit {index} at offset {offset} has forbidden_zero_bit set")]
    ForbiddenBitSet { index: usize, offset: u64 },

    #[error("NAL unit {index} at offset {offset} is empty")]
    EmptyNalUnit { index: usize, offset: u64 },

    #[error("ADTS frame {index} at offset {offset} uses sampling_frequency_index {value:#X}")]
    ReservedSamplingFrequency { index: usize, offset: u64, value: u8 },

    #[error(
        "aac_frame_length {frame_length} at offset {offset} is shorter than the {header_len}-byte header"
    )]
    FrameLengthTooShort {
        offset: u64,
        frame_length: u16,
        header_len: usize,
    },

    #[error("ADTS frame {index} at offset {offset} is truncated, {missing} bytes missing")]
    TruncatedFrame {
        index: usize,
        offset: u64,
        missing: u64,
    },
}
