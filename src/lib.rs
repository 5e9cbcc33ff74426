//! # Blob Reindex
//!
//! Turns a text document from a blob-style object store into bounded-size,
//! stably-addressed chunks and upserts them into a search index. This is
//! the ingestion half of a retrieval-augmented pipeline: the same object
//! name always yields the same chunk ids, so re-indexing overwrites instead
//! of duplicating.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────────────┐   ┌──────────────┐
//! │ ObjectStore │──▶│ decode → chunk → assemble    │──▶│ SearchIndex  │
//! │ Azure/S3/FS │   │ (pure, deterministic)        │   │ Azure/Memory │
//! └─────────────┘   └──────────────────────────────┘   └──────────────┘
//!                                 ▲
//!                      ┌──────────┴──────────┐
//!                      │  CLI  │  HTTP server │
//!                      └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! reindex blob docs/handbook.txt           # re-index one object
//! reindex blob docs/handbook.txt --dry-run # show chunks without upserting
//! reindex prefix docs/                     # re-index everything under a prefix
//! reindex chunk ./local.txt --max-chars 800
//! reindex serve                            # POST /reindex
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`decode`] | Bytes → text with lossy single-byte fallback |
//! | [`chunk`] | Line-boundary chunking with hard-cut fallback |
//! | [`assemble`] | Stable ids, titles, and metadata per chunk |
//! | [`ingest`] | Pipeline orchestration and outcome reporting |
//! | [`traits`] | `ObjectStore` / `SearchIndex` collaborator seams |
//! | [`store`] | Azure Blob, S3, and filesystem stores |
//! | [`index`] | Azure AI Search and in-memory indexes |
//! | [`server`] | HTTP server |
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and wire envelope |
//! | [`error`] | Error taxonomy and codes |

pub mod assemble;
pub mod chunk;
pub mod config;
pub mod decode;
pub mod error;
pub mod index;
pub mod ingest;
pub mod models;
pub mod server;
pub mod store;
pub mod traits;
