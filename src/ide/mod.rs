//! IDE features: thin queries over the symbol and reference indices.
//!
//! Everything here returns plain Rust values; translating them into editor
//! protocol payloads is the transport layer's concern.

pub mod completion;
pub mod goto;
pub mod hover;
pub mod references;
pub mod signature_help;
pub mod symbols;

pub use completion::{CompletionItem, CompletionKind, completions};
pub use goto::definition;
pub use hover::{Hover, hover};
pub use references::find_references;
pub use signature_help::{SignatureHelp, SignatureInfo, signature_help};
pub use symbols::{DocumentSymbol, document_symbols, workspace_symbols};
