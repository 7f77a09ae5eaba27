use super::fallback::fallback_chunks;
use super::languages::LanguageConfig;
use super::{CodeChunk, ExtractionMethod, LogicalUnit, UnitKind};
use crate::error::IngestError;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;
use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIterator, Tree};

/// Result of segmenting one file.
///
/// `units` holds every matched logical unit (including nested ones, used for
/// DEFINES edges); `chunks` holds only outermost units so that chunks within
/// a file never overlap. The parse tree is kept when parsing succeeded so
/// relationship extraction can reuse it without re-parsing.
pub struct SegmentedFile {
    pub language: String,
    pub method: ExtractionMethod,
    pub chunks: Vec<CodeChunk>,
    pub units: Vec<LogicalUnit>,
    pub tree: Option<Tree>,
}

/// Query-driven logical-unit extraction with a fixed-size fallback.
///
/// Compiled queries are built once per engine instance and reused read-only
/// across files; a fresh `Parser` is created per call since parsers are
/// stateful during a parse.
pub struct SegmentationEngine {
    unit_queries: HashMap<&'static str, Query>,
    fallback_window: usize,
}

impl SegmentationEngine {
    pub fn new(fallback_window: usize) -> Result<Self, IngestError> {
        let mut unit_queries = HashMap::new();
        for config in LanguageConfig::get_all() {
            let query = Query::new(&config.language, config.unit_query)
                .map_err(|e| IngestError::Grammar(format!("{}: {e}", config.name)))?;
            unit_queries.insert(config.name, query);
        }
        Ok(Self {
            unit_queries,
            fallback_window,
        })
    }

    /// Segment a file's content. Total: any input produces at least one
    /// chunk, and this function never returns an error.
    pub fn segment(&self, content: &str, path: &Path) -> SegmentedFile {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match LanguageConfig::get_by_extension(ext) {
            Some(config) => self.segment_as(content, &config),
            None => self.fallback_file(content, "unknown", None),
        }
    }

    fn segment_as(&self, content: &str, config: &LanguageConfig) -> SegmentedFile {
        let mut parser = Parser::new();
        if parser.set_language(&config.language).is_err() {
            return self.fallback_file(content, config.name, None);
        }
        let Some(tree) = parser.parse(content, None) else {
            debug!("parse returned no tree for {}", config.name);
            return self.fallback_file(content, config.name, None);
        };

        let units = self.extract_units(tree.root_node(), content.as_bytes(), config.name);

        if units.is_empty() {
            if tree.root_node().has_error() {
                // Whole-file syntax failure: drop the tree so no
                // relationship extraction runs over garbage.
                return self.fallback_file(content, config.name, None);
            }
            // Valid parse with no matching units (e.g. a top-level script).
            // Keep the tree for import/call extraction.
            return self.fallback_file(content, config.name, Some(tree));
        }

        let chunks = outermost_chunks(content, &units, config.name);
        SegmentedFile {
            language: config.name.to_string(),
            method: ExtractionMethod::Ast,
            chunks,
            units,
            tree: Some(tree),
        }
    }

    fn fallback_file(&self, content: &str, language: &str, tree: Option<Tree>) -> SegmentedFile {
        SegmentedFile {
            language: language.to_string(),
            method: ExtractionMethod::Fallback,
            chunks: fallback_chunks(content, language, self.fallback_window),
            units: Vec::new(),
            tree,
        }
    }

    fn extract_units(&self, root: Node, source: &[u8], lang: &str) -> Vec<LogicalUnit> {
        let Some(query) = self.unit_queries.get(lang) else {
            return Vec::new();
        };
        let mut cursor = QueryCursor::new();

        let mut units = Vec::new();
        let mut seen = HashSet::new();

        let mut matches = cursor.matches(query, root, source);
        while let Some(m) = matches.next() {
            let mut main_node = None;
            let mut kind = None;
            let mut name = String::new();

            for cap in m.captures {
                let capture_name = query.capture_names()[cap.index as usize];
                if capture_name == "name" {
                    if let Ok(text) = cap.node.utf8_text(source) {
                        name = text.to_string();
                    }
                } else if let Some(k) = UnitKind::from_capture(capture_name) {
                    main_node = Some(cap.node);
                    kind = Some(k);
                }
            }

            let (Some(node), Some(mut kind)) = (main_node, kind) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let key = (node.start_byte(), node.end_byte(), kind);
            if !seen.insert(key) {
                continue;
            }

            let enclosing = enclosing_name(node, source, lang);
            if kind == UnitKind::Function && enclosing.is_some() {
                kind = UnitKind::Method;
            }

            units.push(LogicalUnit {
                kind,
                name,
                enclosing,
                start_byte: node.start_byte(),
                end_byte: node.end_byte(),
                start_line: node.start_position().row + 1,
                end_line: node.end_position().row + 1,
            });
        }

        units.sort_by(|a, b| {
            a.start_byte
                .cmp(&b.start_byte)
                .then(b.end_byte.cmp(&a.end_byte))
        });
        units
    }
}

/// Keep only outermost units so chunk spans never overlap. Nested units
/// (e.g. methods inside a class body) remain in the unit list for DEFINES
/// edges but their text lives in the enclosing chunk.
fn outermost_chunks(content: &str, units: &[LogicalUnit], language: &str) -> Vec<CodeChunk> {
    let mut chunks = Vec::new();
    let mut last_end = 0usize;
    for unit in units {
        if unit.start_byte < last_end {
            continue;
        }
        let text = content
            .get(unit.start_byte..unit.end_byte)
            .unwrap_or_default()
            .to_string();
        chunks.push(CodeChunk::from_unit(chunks.len(), text, unit, language));
        last_end = unit.end_byte;
    }
    chunks
}

/// Find the enclosing type name for a unit: the receiver type for Go
/// methods, the impl/trait type for Rust, the class for Python/JS/TS/Java.
fn enclosing_name(node: Node, source: &[u8], lang: &str) -> Option<String> {
    if lang == "go" && node.kind() == "method_declaration" {
        let receiver = node.child_by_field_name("receiver")?;
        return find_type_identifier(receiver, source);
    }

    let mut parent = node.parent();
    while let Some(p) = parent {
        let name_node = match (lang, p.kind()) {
            ("python", "class_definition") => p.child_by_field_name("name"),
            ("typescript", "class_declaration") | ("javascript", "class_declaration") => {
                p.child_by_field_name("name")
            }
            ("java", "class_declaration")
            | ("java", "interface_declaration")
            | ("java", "enum_declaration") => p.child_by_field_name("name"),
            ("rust", "impl_item") => p.child_by_field_name("type"),
            ("rust", "trait_item") => p.child_by_field_name("name"),
            _ => None,
        };
        if let Some(n) = name_node {
            if let Ok(text) = n.utf8_text(source) {
                return Some(text.to_string());
            }
        }
        parent = p.parent();
    }
    None
}

fn find_type_identifier(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() == "type_identifier" {
        return node.utf8_text(source).ok().map(str::to_string);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_type_identifier(child, source) {
            return Some(found);
        }
    }
    None
}
