pub mod adts;
pub mod annexb;
pub mod command;
