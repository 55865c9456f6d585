//! Pensum - Course Material Q&A
//!
//! A retrieval-augmented conversation engine over course transcripts.
//!
//! The name "Pensum" comes from the Norwegian word for "curriculum."
//!
//! # Overview
//!
//! Pensum allows you to:
//! - Index course transcripts into a two-tier vector store
//! - Ask questions and get AI-powered answers with citations
//! - Let the model decide when to search and when to answer directly
//! - Keep multi-turn conversations with bounded session history
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `models` - Course, lesson, and chunk data types
//! - `embedding` - Embedding generation
//! - `vector_store` - Course catalog and content storage
//! - `tools` - Retrieval tools exposed to the model
//! - `agent` - The LLM tool-use loop
//! - `session` - Per-session conversation history
//! - `rag` - System orchestration
//!
//! # Example
//!
//! ```rust,no_run
//! use pensum::config::Settings;
//! use pensum::rag::RagSystem;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let system = RagSystem::new(&settings)?;
//!
//!     let response = system.query("What does lesson 3 cover?", None).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod models;
pub mod openai;
pub mod rag;
pub mod session;
pub mod tools;
pub mod vector_store;

pub use error::{PensumError, Result};
