/// Non-syntactic fallback segmentation.
///
/// Splits text into fixed-size character windows aligned to line boundaries.
/// This is the safety net of the segmentation engine: it is total over any
/// input and never returns an error.
use super::{ChunkMetadata, CodeChunk, ExtractionMethod, UnitKind};

/// Split `content` into fallback chunks of at most `window` characters,
/// never cutting inside a line. A single line longer than the window forms
/// its own chunk. Always returns at least one chunk.
pub fn fallback_chunks(content: &str, language: &str, window: usize) -> Vec<CodeChunk> {
    let window = window.max(1);
    let mut chunks = Vec::new();

    let mut current = String::new();
    let mut current_chars = 0usize;
    let mut current_start = 1usize;
    let mut line_no = 0usize;

    for (i, line) in content.lines().enumerate() {
        line_no = i + 1;
        let line_chars = line.chars().count() + 1;

        if current_chars > 0 && current_chars + line_chars > window {
            chunks.push(make_chunk(
                chunks.len(),
                std::mem::take(&mut current),
                language,
                current_start,
                line_no - 1,
            ));
            current_chars = 0;
            current_start = line_no;
        }

        if current_chars > 0 {
            current.push('\n');
        }
        current.push_str(line);
        current_chars += line_chars;
    }

    if current_chars > 0 {
        chunks.push(make_chunk(
            chunks.len(),
            current,
            language,
            current_start,
            line_no,
        ));
    }

    // Totality: even empty or whitespace-only input yields one chunk.
    if chunks.is_empty() {
        chunks.push(make_chunk(0, content.to_string(), language, 1, 1));
    }

    chunks
}

fn make_chunk(
    ordinal: usize,
    content: String,
    language: &str,
    start_line: usize,
    end_line: usize,
) -> CodeChunk {
    CodeChunk {
        ordinal,
        content,
        metadata: ChunkMetadata {
            function_name: None,
            class_name: None,
            start_line,
            end_line: end_line.max(start_line),
            language: language.to_string(),
            unit_kind: UnitKind::UnparsedBlock,
            extraction_method: ExtractionMethod::Fallback,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_input_single_chunk() {
        let chunks = fallback_chunks("hello\nworld\n", "unknown", 1500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.start_line, 1);
        assert_eq!(chunks[0].metadata.end_line, 2);
        assert_eq!(chunks[0].metadata.extraction_method, ExtractionMethod::Fallback);
        assert_eq!(chunks[0].metadata.unit_kind, UnitKind::UnparsedBlock);
    }

    #[test]
    fn test_empty_input_still_yields_chunk() {
        let chunks = fallback_chunks("", "unknown", 1500);
        assert_eq!(chunks.len(), 1, "totality: at least one chunk for any input");
    }

    #[test]
    fn test_window_splits_on_line_boundaries() {
        let content = (0..20).map(|i| format!("line number {i}")).collect::<Vec<_>>().join("\n");
        let chunks = fallback_chunks(&content, "unknown", 40);
        assert!(chunks.len() > 1, "should split into multiple windows");

        // Ordered, non-overlapping
        for pair in chunks.windows(2) {
            assert!(pair[0].metadata.end_line < pair[1].metadata.start_line);
        }
        // Ordinals are consecutive
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.ordinal, i);
        }
    }

    #[test]
    fn test_oversized_line_forms_own_chunk() {
        let long_line = "x".repeat(500);
        let content = format!("short\n{long_line}\nshort again");
        let chunks = fallback_chunks(&content, "unknown", 100);
        assert!(chunks.iter().any(|c| c.content.len() >= 500));
        let total: String = chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("\n");
        assert!(total.contains("short again"), "no data loss");
    }

    #[test]
    fn test_no_unit_names_on_fallback() {
        let chunks = fallback_chunks("def foo(:\n  broken", "python", 1500);
        for c in &chunks {
            assert!(c.metadata.function_name.is_none());
            assert!(c.metadata.class_name.is_none());
        }
    }
}
