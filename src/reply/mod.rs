//! Interpretation of raw assistant replies
//!
//! Directive classification runs before segmentation: a reply that is
//! entirely an image directive never reaches the fence parser.

pub mod directive;
pub mod parser;

pub use directive::{classify_reply, ReplyKind};
pub use parser::parse_reply;
