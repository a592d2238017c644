//! On-disk reference index: storage, writing and point-in-time reads.
//!
//! - [`store`] - memory-mapped multi-maps plus the file and name tables
//! - [`writer`] - builds an index directory from in-memory facts
//! - [`reader`] - [`ReferenceReader`], the query engine over one snapshot
//! - [`codec`] - key and posting bucket encoding
//! - [`stats`] - index statistics

pub mod codec;
pub mod reader;
pub mod stats;
pub mod store;
pub mod types;
pub mod writer;

pub use reader::ReferenceReader;
pub use stats::IndexStats;
pub use store::{IndexedStore, NameTable};
pub use types::*;
pub use writer::IndexWriter;
