use crate::catalog::DEFAULT_LANGUAGE;
use crate::error::VocablyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod http;
pub use http::HttpSynthesisClient;


/// Body of `POST /api/tts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub language: String,
    /// Serialized as `null` when no tone is selected.
    pub instruct: Option<String>,
}

impl SynthesisRequest {
    /// Normalizes user input: text is trimmed and a blank instruction becomes `None`.
    pub fn new(text: &str, voice: &str, instruct: &str) -> Self {
        let instruct = instruct.trim();
        Self {
            text: text.trim().to_string(),
            voice: voice.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            instruct: if instruct.is_empty() {
                None
            } else {
                Some(instruct.to_string())
            },
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisResponse {
    pub audio_base64: String,
    pub sample_rate: Option<u32>,
    pub format: Option<String>,
}

/// Decoded synthesis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub sample_rate: Option<u32>,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    pub status: String,
    pub model: Option<String>,
    #[serde(default)]
    pub speakers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVoice {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VoiceList {
    pub voices: Vec<RemoteVoice>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SynthesisClient: Send + Sync {
    async fn synthesize(
        &self,
        request: SynthesisRequest,
        token: Option<String>,
    ) -> Result<SynthesizedAudio, VocablyError>;
}
