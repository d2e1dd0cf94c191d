use super::{render_examples, render_status, render_tones, render_voices, Command, HELP};
use crate::auth::AuthClient;
use crate::catalog::{find_example, find_tone, find_voice};
use crate::error::VocablyError;
use crate::media::PlaybackEventReceiver;
use crate::speech::{SpeechAction, SpeechController};
use crate::synthesis::{HttpSynthesisClient, SynthesizedAudio};
use anyhow::Result;
use futures::future::BoxFuture;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

const PROMPT: &str = "vocably> ";
const SIGN_IN_FIRST: &str = "Please sign in first: login <username> <password>";

type InFlight = BoxFuture<'static, Result<SynthesizedAudio, VocablyError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMode {
    /// Prompt is shown and synthesis runs in the background while input is read.
    Interactive,
    /// Every command completes before the next line is read.
    Script,
}

/// Line-oriented front end: the sign-in gate, the controls and the status line.
pub struct Shell {
    auth: AuthClient,
    speech: SpeechController,
    backend: HttpSynthesisClient,
    events: PlaybackEventReceiver,
    download_dir: PathBuf,
    mode: ShellMode,
}

enum Flow {
    Continue,
    Quit,
}

impl Shell {
    pub fn new(
        auth: AuthClient,
        speech: SpeechController,
        backend: HttpSynthesisClient,
        events: PlaybackEventReceiver,
        download_dir: PathBuf,
        mode: ShellMode,
    ) -> Self {
        Self {
            auth,
            speech,
            backend,
            events,
            download_dir,
            mode,
        }
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    pub fn speech(&self) -> &SpeechController {
        &self.speech
    }

    pub async fn run<R, W>(&mut self, input: R, mut out: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut in_flight: Option<InFlight> = None;

        if !self.auth.is_authenticated() {
            self.write(&mut out, SIGN_IN_FIRST).await?;
        }
        self.prompt(&mut out).await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        // input closed: let a running request land before leaving
                        if let Some(pending) = in_flight.take() {
                            let outcome = pending.await;
                            self.apply_outcome(&mut out, outcome).await?;
                        }
                        break;
                    };
                    match self.dispatch(&mut out, &line, &mut in_flight).await? {
                        Flow::Quit => break,
                        Flow::Continue => self.prompt(&mut out).await?,
                    }
                }
                outcome = wait_in_flight(&mut in_flight) => {
                    in_flight = None;
                    self.apply_outcome(&mut out, outcome).await?;
                    self.prompt(&mut out).await?;
                }
                Some(event) = self.events.recv() => {
                    let was_playing = self.speech.is_playing();
                    self.speech.handle_playback_event(event);
                    if was_playing && !self.speech.is_playing() {
                        if let Some(reason) = self.speech.state().error() {
                            self.write(&mut out, &format!("error: {}", reason)).await?;
                            self.prompt(&mut out).await?;
                        }
                    }
                }
            }
        }
        out.flush().await?;
        Ok(())
    }

    async fn dispatch<W: AsyncWrite + Unpin>(
        &mut self,
        out: &mut W,
        line: &str,
        in_flight: &mut Option<InFlight>,
    ) -> Result<Flow> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(usage) => {
                self.write(out, &usage).await?;
                return Ok(Flow::Continue);
            }
        };
        debug!(?command, "console command");

        match command {
            Command::Empty => {}
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => self.write(out, HELP).await?,
            Command::Login { username, password } => {
                self.write(out, "Signing in...").await?;
                match self.auth.login(&username, &password).await {
                    Ok(()) => self.write(out, "Signed in.").await?,
                    Err(e) => self.write(out, &format!("error: {}", e)).await?,
                }
            }
            Command::Logout => {
                self.speech.stop_playback();
                self.auth.logout();
                self.write(out, "Signed out.").await?;
            }
            Command::Text(text) => {
                self.speech.set_text(&text);
                self.write(out, &format!("text: {}", self.speech.text_counter()))
                    .await?;
            }
            Command::Example(id) => match find_example(&id) {
                Some(example) => {
                    self.speech.apply_example(example);
                    self.write(out, &format!("{}: {}", example.label, self.speech.text()))
                        .await?;
                }
                None => self.write(out, &format!("unknown example: {}", id)).await?,
            },
            Command::Voice(name) => match find_voice(&name) {
                Some(voice) => {
                    self.speech.set_voice(voice.name);
                    self.write(out, &format!("voice: {}", voice.label)).await?;
                }
                None => self.write(out, &format!("unknown voice: {}", name)).await?,
            },
            Command::Tone(id) => match find_tone(&id) {
                Some(tone) => {
                    self.speech.apply_tone(tone);
                    self.write(out, &format!("tone: {}", tone.label)).await?;
                }
                None => self.write(out, &format!("unknown tone: {}", id)).await?,
            },
            Command::Play => {
                if !self.auth.is_authenticated() {
                    self.write(out, SIGN_IN_FIRST).await?;
                    return Ok(Flow::Continue);
                }
                match self.speech.begin_speech() {
                    Ok(SpeechAction::Stopped) => self.write(out, "stopped").await?,
                    Ok(SpeechAction::Pending(pending)) => {
                        self.write(out, "synthesizing...").await?;
                        match self.mode {
                            ShellMode::Script => {
                                let outcome = pending.send().await;
                                self.apply_outcome(out, outcome).await?;
                            }
                            ShellMode::Interactive => {
                                *in_flight = Some(Box::pin(pending.send()));
                            }
                        }
                    }
                    Err(e) => self.write(out, &format!("error: {}", e)).await?,
                }
            }
            Command::Stop => {
                self.speech.stop_playback();
                self.write(out, "stopped").await?;
            }
            Command::Download(dir) => {
                if !self.auth.is_authenticated() {
                    self.write(out, SIGN_IN_FIRST).await?;
                    return Ok(Flow::Continue);
                }
                let dir = dir.unwrap_or_else(|| self.download_dir.clone());
                match self.speech.download_result(&dir).await {
                    Ok(path) => self.write(out, &format!("saved {}", path.display())).await?,
                    Err(e) => self.write(out, &format!("error: {}", e)).await?,
                }
            }
            Command::Voices {
                remote: false,
                engine,
            } => self.write(out, &render_voices(engine)).await?,
            Command::Voices { remote: true, .. } => match self.backend.voices().await {
                Ok(voices) => {
                    let listing = voices
                        .iter()
                        .map(|v| format!("  {:<10} ({})", v.name, v.id))
                        .collect::<Vec<_>>()
                        .join("\n");
                    self.write(out, &listing).await?;
                }
                Err(e) => self.write(out, &format!("error: {}", e)).await?,
            },
            Command::Tones => self.write(out, &render_tones()).await?,
            Command::Examples => self.write(out, &render_examples()).await?,
            Command::Status => {
                let status = render_status(&self.auth, &self.speech);
                self.write(out, status.trim_end()).await?;
            }
            Command::Health => match self.backend.health().await {
                Ok(status) => {
                    let model = status.model.as_deref().unwrap_or("unknown model");
                    self.write(
                        out,
                        &format!(
                            "backend {}: {} ({} speakers)",
                            status.status,
                            model,
                            status.speakers.len()
                        ),
                    )
                    .await?
                }
                Err(e) => self.write(out, &format!("error: {}", e)).await?,
            },
        }
        Ok(Flow::Continue)
    }

    async fn apply_outcome<W: AsyncWrite + Unpin>(
        &mut self,
        out: &mut W,
        outcome: Result<SynthesizedAudio, VocablyError>,
    ) -> Result<()> {
        match self.speech.finish_speech(outcome) {
            Ok(()) => {
                let size = self.speech.result().map(|r| r.size).unwrap_or_default();
                info!(size, "playing synthesized audio");
                self.write(out, &format!("playing ({} bytes)", size)).await
            }
            Err(e) => self.write(out, &format!("error: {}", e)).await,
        }
    }

    async fn write<W: AsyncWrite + Unpin>(&self, out: &mut W, text: &str) -> Result<()> {
        out.write_all(text.as_bytes()).await?;
        out.write_all(b"\n").await?;
        Ok(())
    }

    async fn prompt<W: AsyncWrite + Unpin>(&self, out: &mut W) -> Result<()> {
        if self.mode == ShellMode::Interactive {
            out.write_all(PROMPT.as_bytes()).await?;
            out.flush().await?;
        }
        Ok(())
    }
}

async fn wait_in_flight(in_flight: &mut Option<InFlight>) -> Result<SynthesizedAudio, VocablyError> {
    match in_flight {
        Some(pending) => pending.await,
        None => std::future::pending().await,
    }
}
