pub mod chunker;
pub mod engine;
pub mod extract;
pub mod fallback;
pub mod generation;
pub mod job_store;
pub mod ocr;
pub mod prompts;
pub mod questions;
pub mod workers_ai;
