//! Relationship extractor: derives typed graph edges (IMPORTS, DEFINES,
//! CALLS) from a segmented file's parse tree.
//!
//! Extraction is pure tree pattern matching — it never evaluates, imports,
//! or executes any part of the analyzed source. Files without a parse tree
//! (fallback segmentation) get no import/call analysis at all; text
//! heuristics over unparsed content are deliberately avoided.

use crate::error::IngestError;
use crate::segmenter::languages::LanguageConfig;
use crate::segmenter::{LogicalUnit, SegmentedFile};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::trace;
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

/// Confidence assigned to calls whose callee is a member access on a
/// receiver rather than a plain identifier. A best-effort default, not a
/// contract.
pub const DYNAMIC_CALL_CONFIDENCE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Imports,
    Defines,
    Calls,
}

impl RelationKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Imports => "IMPORTS",
            RelationKind::Defines => "DEFINES",
            RelationKind::Calls => "CALLS",
        }
    }
}

/// A directed, typed edge with provenance. Confidence < 1.0 signals a
/// best-effort match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub kind: RelationKind,
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_symbol: Option<String>,
    pub target_symbol: String,
    pub line_number: usize,
    pub confidence: f32,
}

/// Common callees that add graph noise rather than signal.
const CALL_NOISE: &[&str] = &[
    "len", "make", "append", "delete", "print", "println", "panic", "recover", "range", "return",
    "break", "continue",
];

pub struct RelationshipExtractor {
    call_queries: HashMap<&'static str, Query>,
    import_queries: HashMap<&'static str, Query>,
}

impl RelationshipExtractor {
    pub fn new() -> Result<Self, IngestError> {
        let mut call_queries = HashMap::new();
        let mut import_queries = HashMap::new();

        for config in LanguageConfig::get_all() {
            if !config.call_query.is_empty() {
                let q = Query::new(&config.language, config.call_query)
                    .map_err(|e| IngestError::Grammar(format!("{} calls: {e}", config.name)))?;
                call_queries.insert(config.name, q);
            }
            if !config.import_query.is_empty() {
                let q = Query::new(&config.language, config.import_query)
                    .map_err(|e| IngestError::Grammar(format!("{} imports: {e}", config.name)))?;
                import_queries.insert(config.name, q);
            }
        }

        Ok(Self {
            call_queries,
            import_queries,
        })
    }

    /// Extract all relationships for one segmented file.
    ///
    /// DEFINES edges come from the logical units found during segmentation;
    /// IMPORTS and CALLS run queries over the retained parse tree. Errors
    /// in a single construct are skipped and never abort the file.
    pub fn extract(
        &self,
        segmented: &SegmentedFile,
        content: &str,
        source_file: &str,
    ) -> Vec<GraphRelationship> {
        let mut relationships = Vec::new();

        for unit in &segmented.units {
            relationships.push(GraphRelationship {
                kind: RelationKind::Defines,
                source_file: source_file.to_string(),
                source_symbol: unit.enclosing.clone(),
                target_symbol: unit.name.clone(),
                line_number: unit.start_line,
                confidence: 1.0,
            });
        }

        let Some(tree) = &segmented.tree else {
            return relationships;
        };
        let root = tree.root_node();
        let source = content.as_bytes();
        let lang = segmented.language.as_str();

        if let Some(query) = self.import_queries.get(lang) {
            relationships.extend(extract_imports(root, source, query, source_file));
        }
        if let Some(query) = self.call_queries.get(lang) {
            relationships.extend(extract_calls(
                root,
                source,
                query,
                source_file,
                &segmented.units,
            ));
        }

        trace!(
            file = source_file,
            count = relationships.len(),
            "extracted relationships"
        );
        relationships
    }
}

fn extract_imports(
    root: Node,
    source: &[u8],
    query: &Query,
    source_file: &str,
) -> Vec<GraphRelationship> {
    let mut cursor = QueryCursor::new();
    let mut relationships = Vec::new();
    let mut seen = HashSet::new();

    let mut matches = cursor.matches(query, root, source);
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let Ok(text) = cap.node.utf8_text(source) else {
                continue;
            };
            let target = text.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
            if target.is_empty() || !seen.insert(target.clone()) {
                continue;
            }
            relationships.push(GraphRelationship {
                kind: RelationKind::Imports,
                source_file: source_file.to_string(),
                source_symbol: None,
                target_symbol: target,
                line_number: cap.node.start_position().row + 1,
                confidence: 1.0,
            });
        }
    }
    relationships
}

fn extract_calls(
    root: Node,
    source: &[u8],
    query: &Query,
    source_file: &str,
    units: &[LogicalUnit],
) -> Vec<GraphRelationship> {
    let mut cursor = QueryCursor::new();
    let mut relationships = Vec::new();
    let mut seen = HashSet::new();

    let mut matches = cursor.matches(query, root, source);
    while let Some(m) = matches.next() {
        for cap in m.captures {
            let capture_name = query.capture_names()[cap.index as usize];
            let confidence = match capture_name {
                "call" => 1.0,
                "dyncall" => DYNAMIC_CALL_CONFIDENCE,
                _ => continue,
            };

            let Ok(text) = cap.node.utf8_text(source) else {
                continue;
            };
            let target = text.trim().to_string();
            if target.is_empty() || CALL_NOISE.contains(&target.as_str()) {
                continue;
            }

            let caller = enclosing_callable(units, cap.node.start_byte());
            if !seen.insert((caller.clone(), target.clone())) {
                continue;
            }

            relationships.push(GraphRelationship {
                kind: RelationKind::Calls,
                source_file: source_file.to_string(),
                source_symbol: caller,
                target_symbol: target,
                line_number: cap.node.start_position().row + 1,
                confidence,
            });
        }
    }
    relationships
}

/// Innermost function/method unit whose span contains the given byte offset.
fn enclosing_callable(units: &[LogicalUnit], byte: usize) -> Option<String> {
    units
        .iter()
        .filter(|u| u.kind.is_callable() && u.start_byte <= byte && byte < u.end_byte)
        .max_by_key(|u| u.start_byte)
        .map(|u| u.name.clone())
}
