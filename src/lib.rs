//! # repoingest — Code Ingestion Core
//!
//! Ingests a source-code repository (local directory or HTTPS git URL),
//! splits each recognized code file into semantically meaningful segments,
//! and extracts structural relationships between files and symbols — all
//! without executing any of the ingested code.
//!
//! ## Architecture
//!
//! - **[`config`]** — Runtime limits and tunables, JSON loading and validation
//! - **[`error`]** — Error taxonomy (pre-flight, per-file, fatal)
//! - **[`crawler`]** — Directory traversal with ignore/binary filtering, git clone acquisition
//! - **[`segmenter`]** — Tree-sitter logical-unit extraction with fixed-size fallback
//! - **[`extractor`]** — IMPORTS / DEFINES / CALLS graph edges with confidence
//! - **[`pipeline`]** — Task state machine, collaborator interfaces, batch orchestrator

pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod segmenter;
