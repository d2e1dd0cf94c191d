use crate::auth::AuthClient;
use crate::catalog::{
    tone_for_instruction, voices_for_engine, Engine, EXAMPLES, TONE_PRESETS, VOICES,
};
use crate::speech::{SpeechController, SpeechState};
use std::fmt::Write as _;
use std::path::PathBuf;

mod shell;
pub use shell::{Shell, ShellMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Text(String),
    Example(String),
    Voice(String),
    Tone(String),
    Play,
    Stop,
    Download(Option<PathBuf>),
    Voices { remote: bool, engine: Option<Engine> },
    Tones,
    Examples,
    Status,
    Health,
    Help,
    Quit,
    Empty,
}

pub const HELP: &str = "\
Commands:
  login <username> <password>   sign in
  logout                        sign out and forget the token
  text <words...>               replace the text to speak
  example <id>                  load an example text (see `examples`)
  voice <name>                  pick a voice (see `voices`)
  tone <id>                     pick a tone preset (see `tones`)
  play                          synthesize and play, or stop if playing
  stop                          stop playback
  download [dir]                save the last result as a wav file
  voices [--remote] [engine]    list voices, optionally for one engine
  tones | examples              list presets
  status                        show the current state
  health                        query the backend
  help | quit";

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let command = match word.to_ascii_lowercase().as_str() {
            "" => Command::Empty,
            "login" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(username), Some(password)) => Command::Login {
                        username: username.to_string(),
                        password: password.to_string(),
                    },
                    _ => return Err("usage: login <username> <password>".to_string()),
                }
            }
            "logout" => Command::Logout,
            "text" | "say" => Command::Text(rest.to_string()),
            "example" => required(rest, "example <id>").map(Command::Example)?,
            "voice" => required(rest, "voice <name>").map(Command::Voice)?,
            "tone" => required(rest, "tone <id>").map(Command::Tone)?,
            "play" | "p" => Command::Play,
            "stop" => Command::Stop,
            "download" | "save" => Command::Download(if rest.is_empty() {
                None
            } else {
                Some(PathBuf::from(rest))
            }),
            "voices" => {
                let mut remote = false;
                let mut engine = None;
                for arg in rest.split_whitespace() {
                    match arg {
                        "--remote" | "remote" => remote = true,
                        other => match Engine::parse(other) {
                            Some(e) => engine = Some(e),
                            None => return Err(format!("unknown engine: {}", other)),
                        },
                    }
                }
                Command::Voices { remote, engine }
            }
            "tones" => Command::Tones,
            "examples" => Command::Examples,
            "status" => Command::Status,
            "health" => Command::Health,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command: {} (try `help`)", other)),
        };
        Ok(command)
    }
}

fn required(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(rest.to_string())
    }
}

pub fn render_status(auth: &AuthClient, speech: &SpeechController) -> String {
    let state = match speech.state() {
        SpeechState::Idle => "idle",
        SpeechState::Loading => "synthesizing",
        SpeechState::Playing => "playing",
        SpeechState::Error(_) => "error",
    };
    let tone = tone_for_instruction(speech.instruct())
        .map(|t| t.label.to_string())
        .unwrap_or_else(|| speech.instruct().to_string());
    let counter = speech.text_counter();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "signed in: {} | state: {} | voice: {} | tone: {}",
        if auth.is_authenticated() { "yes" } else { "no" },
        state,
        speech.voice(),
        tone
    );
    let _ = writeln!(
        out,
        "text: {}{} | download: {}",
        counter,
        if counter.over_warning { " (near limit)" } else { "" },
        if speech.has_result() {
            "ready"
        } else {
            "generate audio first"
        }
    );
    if let Some(reason) = speech.state().error() {
        let _ = writeln!(out, "error: {}", reason);
    }
    out
}

pub fn render_voices(engine: Option<Engine>) -> String {
    let voices: Vec<_> = match engine {
        Some(engine) => voices_for_engine(engine).collect(),
        None => VOICES.iter().collect(),
    };
    voices
        .iter()
        .map(|v| format!("  {:<10} ({})", v.label, v.voice_id))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_tones() -> String {
    TONE_PRESETS
        .iter()
        .map(|t| {
            if t.instruction.is_empty() {
                format!("  {:<9} {}", t.id, t.label)
            } else {
                format!("  {:<9} {}: {}", t.id, t.label, t.instruction)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_examples() -> String {
    EXAMPLES
        .iter()
        .map(|e| format!("  {:<15} {}", e.id, e.label))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("login vocably vocably2026"),
            Ok(Command::Login {
                username: "vocably".to_string(),
                password: "vocably2026".to_string()
            })
        );
        assert!(Command::parse("login vocably").is_err());
        assert_eq!(
            Command::parse("  text   Hello   world "),
            Ok(Command::Text("Hello   world".to_string()))
        );
        assert_eq!(Command::parse("text"), Ok(Command::Text(String::new())));
        assert_eq!(Command::parse("PLAY"), Ok(Command::Play));
        assert_eq!(Command::parse(""), Ok(Command::Empty));
        assert_eq!(Command::parse("download"), Ok(Command::Download(None)));
        assert_eq!(
            Command::parse("download /tmp/out"),
            Ok(Command::Download(Some(PathBuf::from("/tmp/out"))))
        );
        assert_eq!(
            Command::parse("voices --remote"),
            Ok(Command::Voices {
                remote: true,
                engine: None
            })
        );
        assert_eq!(
            Command::parse("voices generative"),
            Ok(Command::Voices {
                remote: false,
                engine: Some(Engine::Premium)
            })
        );
        assert!(Command::parse("voices turbo").is_err());
        assert!(Command::parse("voice").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[test]
    fn test_listings() {
        assert_eq!(render_voices(None).lines().count(), VOICES.len());
        assert_eq!(
            render_voices(Some(Engine::Standard)).lines().count(),
            voices_for_engine(Engine::Standard).count()
        );
        assert!(render_voices(Some(Engine::Premium)).contains("Vivian"));
        assert!(render_tones().contains("whisper   Whisper: Whisper softly and quietly"));
        assert!(render_examples().contains("storyteller"));
    }
}
