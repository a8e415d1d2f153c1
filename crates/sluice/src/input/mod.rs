//! Extraction of raw dataset files.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig, coerce};
pub use source::{SourceMetadata, is_null_token};
