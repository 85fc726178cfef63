//! Roleplay chat with persistent character memory.
//!
//! Reverie keeps every character as a folder of plain markdown documents in
//! a blob store: a card, a message log, and a JSON retrieval index. Each
//! turn it assembles context from three sources before calling an
//! OpenAI-compatible model:
//!
//! - **Long-term memory** — facts distilled from past conversations,
//!   retrieved with BM25 keyword ranking
//! - **Lorebooks** — keyword-triggered world info, private to a character
//!   or shared across all of them
//! - **Recent history** — a sliding window over the message log
//!
//! After each exchange a background extraction pass (when enabled) asks a
//! cheap model to distill new memories from the turn.
//!
//! # Modules
//!
//! - [`store`] — Blob store abstraction over plain files
//! - [`character`] — Character cards, frontmatter, and name slugs
//! - [`memory`] — Index documents, BM25 retrieval, and the index cache
//! - [`lorebook`] — Keyword-triggered world info parsing and matching
//! - [`prompt`] — Sanitization, presets, and system prompt assembly
//! - [`llm`] — OpenAI-compatible transport with SSE streaming
//! - [`chat`] — Turn orchestration tying the rest together

pub mod character;
pub mod chat;
pub mod cli;
pub mod config;
pub mod llm;
pub mod lorebook;
pub mod memory;
pub mod prompt;
pub mod store;
