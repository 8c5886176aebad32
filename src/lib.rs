//! Conversation-scoped retrieval memory for chat assistants.
//!
//! Recollect ingests uploaded images and PDFs into vector embeddings, persists
//! them, and retrieves recent, per-conversation context to augment a
//! text-generation request.
//!
//! | Source | Unit | Rendered in context as |
//! |--------|------|------------------------|
//! | **Image** | one vision-model description | `[Image]: ...` |
//! | **PDF** | 1000-char chunks of each page with enough text | `[PDF Page n]: ...` |
//!
//! # Architecture
//!
//! - **Storage**: exact L2 search over a flat `f32` buffer, persisted as a
//!   bincode blob (`index.bin`) plus a JSON sidecar (`metadata.json`)
//! - **Collaborators**: Ollama for embeddings (`nomic-embed-text`), image
//!   description (`llava`), and generation
//! - **Retrieval**: rank everything, then filter by conversation and recency
//! - **Transport**: MCP over stdio, plus an operator CLI
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files and environment variables
//! - [`error`] - The [`MemoryError`](error::MemoryError) taxonomy
//! - [`index`] - Vector index with aligned metadata and on-disk persistence
//! - [`embedding`] - Text-to-vector embedding via Ollama
//! - [`llm`] - Vision description, text generation, and retry policy
//! - [`memory`] - Chunking, ingestion, retrieval, and statistics
//! - [`prompt`] - Llama-2 style prompt assembly
//! - [`chat`] - Per-message orchestration, history, and attachments

pub mod chat;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod memory;
pub mod prompt;
