use super::{
    BackendStatus, RemoteVoice, SynthesisClient, SynthesisRequest, SynthesisResponse,
    SynthesizedAudio, VoiceList,
};
use crate::api::{transport_error, ApiEndpoint};
use crate::error::{ErrorBody, VocablyError, MSG_TTS_UNREACHABLE};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::StatusCode;
use std::time::Instant;
use tracing::{debug, info, warn};

const GENERIC_FAILURE: &str = "Failed to generate speech. Please try again.";

/// Talks to the Vocably backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSynthesisClient {
    endpoint: ApiEndpoint,
}

impl HttpSynthesisClient {
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &ApiEndpoint {
        &self.endpoint
    }

    /// `GET /`: backend liveness plus the model and speakers it serves.
    pub async fn health(&self) -> Result<BackendStatus, VocablyError> {
        let response = self
            .endpoint
            .http()
            .get(self.endpoint.url("/"))
            .send()
            .await
            .map_err(tts_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(VocablyError::server(status, ErrorBody::read(response).await));
        }
        response
            .json()
            .await
            .map_err(|e| unexpected_response(status, e))
    }

    /// `GET /api/voices`: speakers known to the running model.
    pub async fn voices(&self) -> Result<Vec<RemoteVoice>, VocablyError> {
        let response = self
            .endpoint
            .http()
            .get(self.endpoint.url("/api/voices"))
            .send()
            .await
            .map_err(tts_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(VocablyError::server(status, ErrorBody::read(response).await));
        }
        let list: VoiceList = response
            .json()
            .await
            .map_err(|e| unexpected_response(status, e))?;
        Ok(list.voices)
    }
}

#[async_trait]
impl SynthesisClient for HttpSynthesisClient {
    async fn synthesize(
        &self,
        request: SynthesisRequest,
        token: Option<String>,
    ) -> Result<SynthesizedAudio, VocablyError> {
        let url = self.endpoint.url("/api/tts");
        debug!(
            voice = %request.voice,
            language = %request.language,
            chars = request.text.chars().count(),
            has_instruct = request.instruct.is_some(),
            "sending synthesis request to {}",
            url
        );

        let mut builder = self.endpoint.http().post(&url).json(&request);
        if let Some(token) = token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let request_start_time = Instant::now();
        let response = builder.send().await.map_err(tts_transport_error)?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("synthesis rejected: token missing or expired");
            return Err(VocablyError::SessionExpired);
        }
        if !status.is_success() {
            let detail = ErrorBody::read(response).await;
            let err = VocablyError::server(status, detail);
            warn!(status = status.as_u16(), "synthesis failed: {}", err);
            return Err(err);
        }

        let body: SynthesisResponse = response.json().await.map_err(|e| {
            warn!("malformed synthesis response: {}", e);
            VocablyError::InvalidAudio("response is not valid JSON".to_string())
        })?;
        let bytes = BASE64_STANDARD
            .decode(body.audio_base64.trim())
            .map_err(|e| VocablyError::InvalidAudio(e.to_string()))?;

        info!(
            bytes = bytes.len(),
            elapsed_ms = request_start_time.elapsed().as_millis() as u64,
            "synthesis completed"
        );
        Ok(SynthesizedAudio {
            bytes,
            sample_rate: body.sample_rate,
            format: body.format.unwrap_or_else(|| "wav".to_string()),
        })
    }
}

fn unexpected_response(status: StatusCode, e: reqwest::Error) -> VocablyError {
    warn!("unexpected response body: {}", e);
    VocablyError::Server {
        status: status.as_u16(),
        message: "Unexpected response from server.".to_string(),
    }
}

fn tts_transport_error(e: reqwest::Error) -> VocablyError {
    transport_error(e, MSG_TTS_UNREACHABLE, MSG_TTS_UNREACHABLE, GENERIC_FAILURE)
}
