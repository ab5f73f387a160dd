//! `PostgreSQL` COPY support.
//!
//! - **Binary format** ([`BinaryCopyWriter`], [`BinaryCopyReader`]) - the
//!   `PGCOPY` wire encoding, usable without a server
//! - **Text format** ([`TextCopyWriter`], [`parse_text_row`]) - tab separated
//!   rows with `\N` nulls and backslash escapes
//! - **Streaming** ([`BinaryImporter`] and the `PostgresConnection` COPY
//!   methods) - moving those encodings through a live connection

pub mod binary;
pub mod stream;
pub mod text;

// Re-exports
pub use binary::{BinaryCopyReader, BinaryCopyWriter, BinaryRow, CopyDecode, CopyValue};
pub use stream::BinaryImporter;
pub use text::{TextCopyWriter, parse_text_row};
