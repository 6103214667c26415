//! Grounding metadata attached to a generated answer.
//!
//! Every field is optional on the wire. A missing field means "no citation"
//! and is never treated as a fault.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub web_search_queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding_chunks: Vec<GroundingChunk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding_supports: Vec<GroundingSupport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_entry_point: Option<SearchEntryPoint>,
}

/// Pre-rendered search suggestions the provider asks clients to display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntryPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_content: Option<String>,
}

/// A cited web source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSource>,
}

impl GroundingChunk {
    #[must_use]
    pub fn web(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            web: Some(WebSource {
                uri: Some(uri.into()),
                title: Some(title.into()),
            }),
        }
    }

    /// `(uri, title)` when the chunk exposes both.
    #[must_use]
    pub fn uri_and_title(&self) -> Option<(&str, &str)> {
        let web = self.web.as_ref()?;
        let uri = web.uri.as_deref().filter(|u| !u.is_empty())?;
        let title = web.title.as_deref().filter(|t| !t.is_empty())?;
        Some((uri, title))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Links a segment of the answer to the chunks backing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSupport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<TextSegment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding_chunk_indices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confidence_scores: Vec<f64>,
}

impl GroundingSupport {
    #[must_use]
    pub fn new(text: impl Into<String>, chunk_indices: Vec<usize>) -> Self {
        Self {
            segment: Some(TextSegment {
                text: Some(text.into()),
                ..TextSegment::default()
            }),
            grounding_chunk_indices: chunk_indices,
            confidence_scores: Vec::new(),
        }
    }

    #[must_use]
    pub fn cites(&self, chunk_index: usize) -> bool {
        self.grounding_chunk_indices.contains(&chunk_index)
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.segment.as_ref()?.text.as_deref()
    }
}

/// Offsets are byte positions into the answer text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
