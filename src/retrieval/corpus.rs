//! Reading the chunk export produced by the external corpus indexer

use crate::error::{IarisError, Result};
use crate::retrieval::Chunk;
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load chunks from a JSON Lines export, one chunk object per line.
///
/// Blank lines are skipped. A malformed line fails the whole load and the
/// error carries its 1-based line number.
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let file = std::fs::File::open(path).map_err(|e| IarisError::Io {
        source: e,
        context: format!("Failed to open corpus file: {}", path.display()),
    })?;

    let mut chunks = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| IarisError::Io {
            source: e,
            context: format!("Failed to read corpus file: {}", path.display()),
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let chunk: Chunk = serde_json::from_str(&line).map_err(|e| IarisError::Corpus {
            path: path.to_path_buf(),
            line: idx + 1,
            message: e.to_string(),
        })?;
        chunks.push(chunk);
    }

    tracing::info!("Loaded {} chunks from {}", chunks.len(), path.display());
    Ok(chunks)
}

/// Distinct subject tags present in `chunks`, sorted
pub fn corpus_topics(chunks: &[Chunk]) -> BTreeSet<String> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.subject.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_chunks_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"text": "Teoria da mudança", "source": "data/tm.txt", "page": 3, "subject": "teoria_da_mudanca"}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"text": "Stakeholders", "source": "data/sh.txt"}}"#).unwrap();

        let chunks = load_chunks(file.path()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page, Some(3));
        assert_eq!(chunks[0].subject.as_deref(), Some("teoria_da_mudanca"));
        assert_eq!(chunks[1].page, None);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"text": "ok", "source": "a"}}"#).unwrap();
        writeln!(file, r#"{{"text": "missing source"}}"#).unwrap();

        match load_chunks(file.path()) {
            Err(IarisError::Corpus { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corpus error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = load_chunks(Path::new("/nonexistent/corpus.jsonl"));
        assert!(matches!(result, Err(IarisError::Io { .. })));
    }

    #[test]
    fn test_corpus_topics() {
        let chunks = vec![
            Chunk::new("a", "x").with_subject("stakeholders"),
            Chunk::new("b", "y"),
            Chunk::new("c", "z").with_subject("metricas"),
            Chunk::new("d", "w").with_subject("stakeholders"),
        ];

        let topics: Vec<String> = corpus_topics(&chunks).into_iter().collect();
        assert_eq!(topics, vec!["metricas", "stakeholders"]);
    }
}
