//! Shared vocabulary for the Nar compiler stages.

pub mod builtins;
pub mod constant;
pub mod ident;
pub mod span;

pub use constant::ConstValue;
pub use span::{FileId, LineIndex, Location, Span};
