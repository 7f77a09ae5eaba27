//! Segmentation engine: converts one file's text into an ordered sequence
//! of [`CodeChunk`] records.
//!
//! The AST path parses the file with a per-language Tree-sitter grammar and
//! extracts logical units (functions, classes, methods, ...) with byte-exact
//! boundaries. The fallback path splits the text into fixed-size character
//! windows and is total over any input.

pub mod engine;
pub mod fallback;
pub mod languages;

pub use engine::{SegmentationEngine, SegmentedFile};

use serde::{Deserialize, Serialize};

/// Kind of syntactic construct a chunk was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Trait,
    UnparsedBlock,
}

impl UnitKind {
    /// Map a query capture name (`@function`, `@class`, ...) to a kind.
    pub(crate) fn from_capture(name: &str) -> Option<UnitKind> {
        match name {
            "function" => Some(UnitKind::Function),
            "method" => Some(UnitKind::Method),
            "class" => Some(UnitKind::Class),
            "struct" => Some(UnitKind::Struct),
            "interface" => Some(UnitKind::Interface),
            "trait" => Some(UnitKind::Trait),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, UnitKind::Function | UnitKind::Method)
    }
}

/// How a chunk's boundaries were determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Ast,
    Fallback,
}

/// A transient parse result: one syntactic construct with byte-exact
/// boundaries. Never persisted directly; always converted to a [`CodeChunk`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalUnit {
    pub kind: UnitKind,
    pub name: String,
    /// Enclosing class / impl type / receiver type, when applicable.
    pub enclosing: Option<String>,
    pub start_byte: usize,
    pub end_byte: usize,
    /// 1-based line numbers.
    pub start_line: usize,
    pub end_line: usize,
}

/// Persisted chunk metadata, serialized as the external JSON schema
/// (`function_name` / `class_name` / `type`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub language: String,
    #[serde(rename = "type")]
    pub unit_kind: UnitKind,
    pub extraction_method: ExtractionMethod,
}

/// The persisted segment of one file. Immutable after creation; chunks
/// within a file are non-overlapping and ordered by `start_line`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Ordinal index within the owning file.
    pub ordinal: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl CodeChunk {
    /// Build a chunk from an AST-derived logical unit.
    pub(crate) fn from_unit(ordinal: usize, content: String, unit: &LogicalUnit, language: &str) -> Self {
        let (function_name, class_name) = match unit.kind {
            UnitKind::Function => (Some(unit.name.clone()), None),
            UnitKind::Method => (Some(unit.name.clone()), unit.enclosing.clone()),
            UnitKind::Class | UnitKind::Struct | UnitKind::Interface | UnitKind::Trait => {
                (None, Some(unit.name.clone()))
            }
            UnitKind::UnparsedBlock => (None, None),
        };
        CodeChunk {
            ordinal,
            content,
            metadata: ChunkMetadata {
                function_name,
                class_name,
                start_line: unit.start_line,
                end_line: unit.end_line,
                language: language.to_string(),
                unit_kind: unit.kind,
                extraction_method: ExtractionMethod::Ast,
            },
        }
    }
}
