pub mod decimal;
pub mod entities;
pub mod lexicon;
pub mod medical_correction;
pub mod sanitize;
pub mod text_only;
pub mod types;

pub use entities::*;
pub use lexicon::{Lexicon, LexiconError, TestDefinition};
pub use sanitize::*;
pub use text_only::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format for extraction: {0}")]
    UnsupportedFormat(String),
}
