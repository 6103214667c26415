//! In-process driver double for unit tests.

use std::sync::Mutex;

use crate::credential::ApiKey;
use crate::error::ProviderError;

use super::{
    Candidate, Content, GenerateRequest, GenerateResponse, GroundingChunk, GroundingMetadata,
    GroundingSupport, LlmDriver,
};

/// Records every call and answers with a canned grounded response.
#[derive(Debug, Default)]
pub(crate) struct RecordingDriver {
    pub keys: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
    pub fail_with: Mutex<Option<(u16, String)>>,
}

impl RecordingDriver {
    pub fn failing(status: u16, message: &str) -> Self {
        let driver = Self::default();
        *driver.fail_with.lock().unwrap() = Some((status, message.to_string()));
        driver
    }

    pub fn calls(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    pub fn last_key(&self) -> Option<String> {
        self.keys.lock().unwrap().last().cloned()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

pub(crate) fn grounded_response(answer: &str) -> GenerateResponse {
    GenerateResponse {
        candidates: vec![Candidate {
            content: Some(Content::model(answer)),
            grounding_metadata: Some(GroundingMetadata {
                web_search_queries: vec!["example query".to_string()],
                grounding_chunks: vec![
                    GroundingChunk::web("https://a.example", "Source A"),
                    GroundingChunk::web("https://b.example", "Source B"),
                ],
                grounding_supports: vec![GroundingSupport::new("Cited text.", vec![0])],
                search_entry_point: None,
            }),
            finish_reason: Some("STOP".to_string()),
        }],
        prompt_feedback: None,
    }
}

#[async_trait::async_trait]
impl LlmDriver for RecordingDriver {
    async fn generate(
        &self,
        api_key: &ApiKey,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, ProviderError> {
        self.keys.lock().unwrap().push(api_key.expose().to_string());
        self.requests.lock().unwrap().push(request);

        if let Some((status, message)) = self.fail_with.lock().unwrap().clone() {
            return Err(ProviderError::Api { status, message });
        }
        Ok(grounded_response("Overview:\nAn answer."))
    }
}
