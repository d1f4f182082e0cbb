//! Ingest and retrieval orchestration over the chunk, embed, vector and
//! rerank crates.

pub mod context;
pub mod generate;
pub mod pipeline;

pub use context::{compress_context, dedup_best, RetrievalPolicy};
pub use generate::HttpGenerator;
pub use pipeline::Pipeline;
