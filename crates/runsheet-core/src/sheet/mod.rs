//! Run-sheet parsing: segmentation, field normalization and validation.

pub mod parser;
pub mod registry;
pub mod rules;
pub mod segment;
pub mod validate;

pub use parser::RunSheetParser;
pub use registry::{GenericProfile, ParserRegistry, SourceProfile};
pub use segment::{JobSegment, Segmenter};
pub use validate::{ValidationOutcome, Validator, Verdict};
