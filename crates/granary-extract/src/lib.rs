//! Document text extraction and semantic chunking
//!
//! Turns downloaded PDF/DOCX/HTML/TXT files into ordered, overlapping text
//! chunks with character offsets, ready for embedding.

pub mod chunker;
pub mod error;
pub mod extractor;

pub use chunker::{ChunkerConfig, TextChunk, chunk_text};
pub use error::{ExtractError, ExtractResult};
pub use extractor::{DocumentFormat, extract_text};
