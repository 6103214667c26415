//! Cited source extraction.
//!
//! Walks the grounding metadata of one answer and produces at most one
//! [`Source`] per distinct URL, in first-seen order, each carrying the
//! answer segments that cite it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::llm::{GroundingMetadata, GroundingSupport};

/// A web source cited by an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    /// Space-joined answer segments that cite this source; empty when none do.
    pub snippet: String,
}

/// Deduplicate cited chunks into sources.
///
/// Chunks missing a URI or title are skipped. When a URL repeats, the first
/// chunk's title is kept and later ones are ignored entirely.
#[must_use]
pub fn extract_sources(metadata: &GroundingMetadata) -> Vec<Source> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut sources = Vec::new();

    for (index, chunk) in metadata.grounding_chunks.iter().enumerate() {
        let Some((url, title)) = chunk.uri_and_title() else {
            continue;
        };
        if !seen.insert(url) {
            continue;
        }
        sources.push(Source {
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet_for(index, &metadata.grounding_supports),
        });
    }

    sources
}

fn snippet_for(chunk_index: usize, supports: &[GroundingSupport]) -> String {
    supports
        .iter()
        .filter(|support| support.cites(chunk_index))
        .filter_map(GroundingSupport::text)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GroundingChunk, WebSource};

    fn metadata(chunks: Vec<GroundingChunk>, supports: Vec<GroundingSupport>) -> GroundingMetadata {
        GroundingMetadata {
            web_search_queries: Vec::new(),
            grounding_chunks: chunks,
            grounding_supports: supports,
            search_entry_point: None,
        }
    }

    #[test]
    fn test_duplicate_url_keeps_first_title() {
        let meta = metadata(
            vec![
                GroundingChunk::web("https://a.example", "First Title"),
                GroundingChunk::web("https://a.example", "Second Title"),
            ],
            Vec::new(),
        );
        let sources = extract_sources(&meta);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "First Title");
    }

    #[test]
    fn test_snippets_join_in_support_order() {
        let meta = metadata(
            vec![GroundingChunk::web("https://a.example", "A")],
            vec![
                GroundingSupport::new("A", vec![0]),
                GroundingSupport::new("B", vec![0, 1]),
            ],
        );
        let sources = extract_sources(&meta);
        assert_eq!(sources[0].snippet, "A B");
    }

    #[test]
    fn test_uncited_chunk_has_empty_snippet() {
        let meta = metadata(
            vec![
                GroundingChunk::web("https://a.example", "A"),
                GroundingChunk::web("https://b.example", "B"),
            ],
            vec![GroundingSupport::new("only a", vec![0])],
        );
        let sources = extract_sources(&meta);
        assert_eq!(sources[0].snippet, "only a");
        assert_eq!(sources[1].snippet, "");
    }

    #[test]
    fn test_incomplete_chunks_are_skipped_but_keep_their_index() {
        let meta = metadata(
            vec![
                GroundingChunk {
                    web: Some(WebSource {
                        uri: Some("https://untitled.example".to_string()),
                        title: None,
                    }),
                },
                GroundingChunk::default(),
                GroundingChunk::web("https://c.example", "C"),
            ],
            vec![
                GroundingSupport::new("about untitled", vec![0]),
                GroundingSupport::new("about c", vec![2]),
            ],
        );
        let sources = extract_sources(&meta);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://c.example");
        assert_eq!(sources[0].snippet, "about c");
    }

    #[test]
    fn test_supports_without_text_contribute_nothing() {
        let meta = metadata(
            vec![GroundingChunk::web("https://a.example", "A")],
            vec![
                GroundingSupport {
                    segment: None,
                    grounding_chunk_indices: vec![0],
                    confidence_scores: vec![0.5],
                },
                GroundingSupport::new("kept", vec![0]),
            ],
        );
        assert_eq!(extract_sources(&meta)[0].snippet, "kept");
    }

    #[test]
    fn test_first_seen_order() {
        let meta = metadata(
            vec![
                GroundingChunk::web("https://b.example", "B"),
                GroundingChunk::web("https://a.example", "A"),
                GroundingChunk::web("https://b.example", "B again"),
            ],
            Vec::new(),
        );
        let urls: Vec<_> = extract_sources(&meta)
            .into_iter()
            .map(|s| s.url)
            .collect();
        assert_eq!(urls, vec!["https://b.example", "https://a.example"]);
    }

    #[test]
    fn test_empty_metadata() {
        assert!(extract_sources(&GroundingMetadata::default()).is_empty());
    }
}
