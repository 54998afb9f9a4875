//! Small shared utilities: identifier generation and JSON glue.

pub mod ids;
pub mod json_ext;
