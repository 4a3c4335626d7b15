//! Read-only PDF analysis.
//!
//! [`Document::open`] validates a file, walks its cross reference chain,
//! authenticates against the standard security handler and assembles the page
//! tree. The loaded document then answers queries about objects, streams and
//! pages.

mod object;
pub use object::{decode_text_string, Dictionary, Keyword, Object, ObjectId, StringFormat};

pub mod content;
mod document;
pub use document::Document;

pub mod encryption;
pub use encryption::{DecryptionStatus, Permissions};

pub mod error;
pub use error::{Error, Result};

pub mod filters;
mod load_options;
pub use load_options::{LoadOptions, LoadOptionsBuilder};

mod object_table;
pub use object_table::{IndirectObject, ObjectKind, ObjectLocation, ObjectTable, StreamSpan};

pub mod pages;
pub mod parser;
mod reader;

mod writer;
pub use writer::Writer;

pub mod xobject;
pub mod xref;
