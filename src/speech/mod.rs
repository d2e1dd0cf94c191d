use crate::catalog::{
    clamp_text, Example, TextCounter, TonePreset, DEFAULT_LANGUAGE, DEFAULT_TEXT, DEFAULT_VOICE,
    PRODUCT_NAME,
};
use crate::error::VocablyError;
use crate::media::{
    wav, AudioPlayer, AudioResource, PlaybackEvent, PlaybackEventKind, ResourceRegistry, WAV_MIME,
};
use crate::session::SessionStore;
use crate::synthesis::{SynthesisClient, SynthesisRequest, SynthesizedAudio};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};


/// What the play control currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechState {
    Idle,
    Loading,
    Playing,
    Error(String),
}

impl SpeechState {
    pub fn error(&self) -> Option<&str> {
        match self {
            SpeechState::Error(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Result of pressing the play/stop control.
pub enum SpeechAction {
    /// Playback was running and has been stopped; no request was made.
    Stopped,
    /// A synthesis request is ready to be sent.
    Pending(PendingSpeech),
}

/// A synthesis request detached from the controller, so the caller can keep
/// handling input while it is in flight.
pub struct PendingSpeech {
    client: Arc<dyn SynthesisClient>,
    request: SynthesisRequest,
    token: Option<String>,
}

impl PendingSpeech {
    pub fn request(&self) -> &SynthesisRequest {
        &self.request
    }

    pub async fn send(self) -> Result<SynthesizedAudio, VocablyError> {
        self.client.synthesize(self.request, self.token).await
    }
}

/// Owns the text, voice and tone selection, the single playable result and
/// the playback lifecycle.
pub struct SpeechController {
    client: Arc<dyn SynthesisClient>,
    session: SessionStore,
    registry: ResourceRegistry,
    player: Box<dyn AudioPlayer>,
    text: String,
    voice: String,
    instruct: String,
    language: String,
    state: SpeechState,
    result: Option<AudioResource>,
    next_playback_id: u64,
    current_playback: Option<u64>,
}

impl SpeechController {
    pub fn new(
        client: Arc<dyn SynthesisClient>,
        session: SessionStore,
        registry: ResourceRegistry,
        player: Box<dyn AudioPlayer>,
    ) -> Self {
        Self {
            client,
            session,
            registry,
            player,
            text: DEFAULT_TEXT.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            instruct: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            state: SpeechState::Idle,
            result: None,
            next_playback_id: 0,
            current_playback: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Input longer than the maximum is truncated.
    pub fn set_text(&mut self, text: &str) {
        self.text = clamp_text(text);
    }

    pub fn text_counter(&self) -> TextCounter {
        TextCounter::for_text(&self.text)
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn set_voice(&mut self, voice: &str) {
        self.voice = voice.to_string();
    }

    pub fn instruct(&self) -> &str {
        &self.instruct
    }

    pub fn set_instruct(&mut self, instruct: &str) {
        self.instruct = instruct.to_string();
    }

    pub fn apply_tone(&mut self, tone: &TonePreset) {
        self.instruct = tone.instruction.to_string();
    }

    pub fn apply_example(&mut self, example: &Example) {
        self.set_text(example.text);
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }

    pub fn state(&self) -> &SpeechState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SpeechState::Loading
    }

    pub fn is_playing(&self) -> bool {
        self.state == SpeechState::Playing
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&AudioResource> {
        self.result.as_ref()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    fn fail(&mut self, err: VocablyError) -> VocablyError {
        self.state = SpeechState::Error(err.to_string());
        err
    }

    /// Play/stop toggle. Stops a running playback, otherwise validates the
    /// input and prepares a synthesis request.
    pub fn begin_speech(&mut self) -> Result<SpeechAction, VocablyError> {
        if self.state == SpeechState::Playing {
            self.stop_playback();
            return Ok(SpeechAction::Stopped);
        }
        if self.state == SpeechState::Loading {
            return Err(VocablyError::Busy);
        }
        if self.text.trim().is_empty() {
            return Err(self.fail(VocablyError::empty_text()));
        }

        self.state = SpeechState::Loading;
        let request = SynthesisRequest::new(&self.text, &self.voice, &self.instruct)
            .with_language(&self.language);
        Ok(SpeechAction::Pending(PendingSpeech {
            client: self.client.clone(),
            request,
            token: self.session.get(),
        }))
    }

    /// Applies the outcome of a request started by [`begin_speech`](Self::begin_speech).
    ///
    /// Whatever arrives is applied; there is no check that it belongs to the
    /// most recent request.
    pub fn finish_speech(
        &mut self,
        outcome: Result<SynthesizedAudio, VocablyError>,
    ) -> Result<(), VocablyError> {
        let audio = match outcome {
            Ok(audio) => audio,
            Err(e) => {
                warn!("speech request failed: {}", e);
                return Err(self.fail(e));
            }
        };

        match wav::probe(&audio.bytes) {
            Ok(info) => info!(
                voice = %self.voice,
                bytes = audio.bytes.len(),
                "generated {:.2}s of audio",
                info.duration().as_secs_f64()
            ),
            Err(e) => debug!("audio is not a readable wav: {}", e),
        }

        self.release_result();
        let resource = self.registry.create(audio.bytes, WAV_MIME);
        let data = self.registry.fetch(&resource.url).unwrap_or_default();
        self.result = Some(resource);

        self.next_playback_id += 1;
        let playback_id = self.next_playback_id;
        match self.player.play(playback_id, data) {
            Ok(()) => {
                self.current_playback = Some(playback_id);
                self.state = SpeechState::Playing;
                Ok(())
            }
            Err(e) => {
                warn!("failed to start playback: {:?}", e);
                self.current_playback = None;
                Err(self.fail(e))
            }
        }
    }

    /// Play/stop toggle including the network round trip.
    pub async fn request_speech(&mut self) -> Result<(), VocablyError> {
        match self.begin_speech()? {
            SpeechAction::Stopped => Ok(()),
            SpeechAction::Pending(pending) => {
                let outcome = pending.send().await;
                self.finish_speech(outcome)
            }
        }
    }

    pub fn stop_playback(&mut self) {
        self.player.stop();
        self.current_playback = None;
        if self.state == SpeechState::Playing {
            self.state = SpeechState::Idle;
        }
    }

    /// Applies a completion reported by the player. Events from a playback
    /// that was stopped or replaced are ignored.
    pub fn handle_playback_event(&mut self, event: PlaybackEvent) {
        if self.current_playback != Some(event.playback_id) {
            debug!(playback_id = event.playback_id, "ignoring stale playback event");
            return;
        }
        self.current_playback = None;
        match event.kind {
            PlaybackEventKind::Ended => {
                if self.state == SpeechState::Playing {
                    self.state = SpeechState::Idle;
                }
            }
            PlaybackEventKind::Failed(reason) => {
                warn!("playback failed: {}", reason);
                self.fail(VocablyError::Playback(reason));
            }
        }
    }

    /// Saves the current result into `dir` and returns the written path.
    pub async fn download_result(&mut self, dir: &Path) -> Result<PathBuf, VocablyError> {
        self.download_result_at(dir, Utc::now()).await
    }

    pub async fn download_result_at(
        &mut self,
        dir: &Path,
        now: DateTime<Utc>,
    ) -> Result<PathBuf, VocablyError> {
        let held = self
            .result
            .as_ref()
            .and_then(|r| self.registry.fetch(&r.url));
        let data = match held {
            Some(data) => data,
            None => return Err(self.fail(VocablyError::NoAudio)),
        };

        let path = unique_path(dir, &download_filename(&self.voice, now)).await;
        if let Err(e) = tokio::fs::write(&path, &data).await {
            warn!(path = %path.display(), "failed to save audio: {}", e);
            return Err(self.fail_download(e.into()));
        }
        info!(path = %path.display(), bytes = data.len(), "audio saved");
        Ok(path)
    }

    /// A failed save leaves a running playback alone, so play still stops it.
    fn fail_download(&mut self, err: VocablyError) -> VocablyError {
        if self.state == SpeechState::Playing {
            err
        } else {
            self.fail(err)
        }
    }

    fn release_result(&mut self) {
        if let Some(previous) = self.result.take() {
            self.registry.revoke(&previous.url);
        }
    }
}

impl Drop for SpeechController {
    fn drop(&mut self) {
        self.player.stop();
        self.release_result();
    }
}

/// `Vocably_<voice>_<YYYY-MM-DDTHH-MM-SS>.wav`, timestamp in UTC.
pub fn download_filename(voice: &str, now: DateTime<Utc>) -> String {
    let voice: String = voice
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    format!(
        "{}_{}_{}.wav",
        PRODUCT_NAME,
        voice,
        now.format("%Y-%m-%dT%H-%M-%S")
    )
}

async fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }
    let stem = filename.trim_end_matches(".wav");
    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{} ({}).wav", stem, n));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}
