//! Document model module.
//!
//! Loads a document, extracts its canonical metadata once, and exposes a
//! lazily-queried structural view for rules.

pub mod extract;
pub mod model;
pub mod source;
pub mod structure;

pub use extract::{extract, extract_str, ExtractionError};
pub use model::{set_equivalent, DocStatus, DocumentModel};
pub use source::{DocumentSource, LoadedDocument};
pub use structure::{Dom, StructureError};
