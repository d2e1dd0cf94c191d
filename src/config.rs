use crate::api::DEFAULT_BACKEND_URL;
use crate::catalog::{find_voice, Engine, DEFAULT_LANGUAGE, DEFAULT_VOICE};
use crate::version;
use anyhow::{anyhow, Error};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const BACKEND_URL_ENV: &str = "VOCABLY_BACKEND_URL";
pub const USERNAME_ENV: &str = "VOCABLY_USERNAME";
pub const PASSWORD_ENV: &str = "VOCABLY_PASSWORD";

#[derive(Parser, Debug)]
#[command(
    version = version::get_short_version(),
    about = "Terminal client for the Vocably text-to-speech service",
    long_about = version::get_version_info()
)]
pub struct Cli {
    /// Path to a TOML config file
    #[clap(long)]
    pub conf: Option<String>,
    /// Overrides `backend_url` from the config and the environment
    #[clap(long)]
    pub backend_url: Option<String>,
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Interactive console (the default)
    Shell,
    /// Sign in, synthesize one text and save it as a wav file
    Speak {
        /// Text to speak; `--example` is used when omitted
        text: Option<String>,
        #[clap(long, conflicts_with = "text")]
        example: Option<String>,
        #[clap(long)]
        voice: Option<String>,
        /// Tone preset id, e.g. `whisper`
        #[clap(long)]
        tone: Option<String>,
        #[clap(long, env = USERNAME_ENV)]
        username: String,
        #[clap(long, env = PASSWORD_ENV, hide_env_values = true)]
        password: String,
        #[clap(long)]
        output_dir: Option<PathBuf>,
        /// Also play the result through the configured player
        #[clap(long)]
        play: bool,
    },
    /// List the voices
    Voices {
        /// Ask the backend instead of the built-in catalog
        #[clap(long)]
        remote: bool,
        /// Only voices offered by this engine (standard/neural, premium/generative)
        #[clap(long, value_parser = parse_engine)]
        engine: Option<Engine>,
    },
    /// Query the backend status endpoint
    Health,
    /// Validate the configuration and exit
    CheckConfig,
}

fn parse_engine(value: &str) -> Result<Engine, String> {
    Engine::parse(value).ok_or_else(|| format!("unknown engine: {}", value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    #[default]
    System,
    Silent,
    Cpal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub login_timeout_secs: u64,
    pub download_dir: PathBuf,
    pub voice: String,
    pub language: String,
    pub player: PlayerKind,
    pub player_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            log_level: Some("info".to_string()),
            log_file: None,
            login_timeout_secs: 30,
            download_dir: PathBuf::from("."),
            voice: DEFAULT_VOICE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            player: PlayerKind::default(),
            player_command: None,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow!("{}: {}", e, path))?,
        )?;
        Ok(config)
    }

    /// Environment wins over the file, matching how the backend address is
    /// injected at deploy time.
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend_url = url.trim().to_string();
            }
        }
        self
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs.max(1))
    }

    pub fn check(&self) -> Result<(), Error> {
        let url = Url::parse(&self.backend_url)
            .map_err(|e| anyhow!("backend_url {}: {}", self.backend_url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("backend_url must be http or https"));
        }
        if find_voice(&self.voice).is_none() {
            return Err(anyhow!("unknown voice: {}", self.voice));
        }
        if self.player == PlayerKind::Cpal && !cfg!(feature = "playback-cpal") {
            return Err(anyhow!(
                "player = \"cpal\" requires the playback-cpal feature"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.login_timeout(), Duration::from_secs(30));
        assert_eq!(config.voice, "Vivian");
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            backend_url = "https://tts.example.com"
            login_timeout_secs = 45
            voice = "Aria"
            player = "silent"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend_url, "https://tts.example.com");
        assert_eq!(config.login_timeout(), Duration::from_secs(45));
        assert_eq!(config.player, PlayerKind::Silent);
        assert_eq!(config.language, "Auto");
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_check_rejects_bad_values() {
        let config = Config {
            backend_url: "localhost".to_string(),
            ..Default::default()
        };
        assert!(config.check().is_err());

        let config = Config {
            voice: "Nobody".to_string(),
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_cli_parsing() {
        let long_about = Cli::command().get_long_about().map(|s| s.to_string());
        assert_eq!(long_about.as_deref(), Some(version::get_version_info()));

        let cli = Cli::parse_from(["vocably", "--conf", "vocably.toml"]);
        assert_eq!(cli.conf.as_deref(), Some("vocably.toml"));
        assert_eq!(cli.command, None);

        let cli = Cli::parse_from([
            "vocably",
            "speak",
            "Hello",
            "--voice",
            "Ryan",
            "--username",
            "vocably",
            "--password",
            "secret",
        ]);
        match cli.command {
            Some(CliCommand::Speak {
                text, voice, play, ..
            }) => {
                assert_eq!(text.as_deref(), Some("Hello"));
                assert_eq!(voice.as_deref(), Some("Ryan"));
                assert!(!play);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["vocably", "voices", "--remote"]);
        assert_eq!(
            cli.command,
            Some(CliCommand::Voices {
                remote: true,
                engine: None
            })
        );

        let cli = Cli::parse_from(["vocably", "voices", "--engine", "neural"]);
        assert_eq!(
            cli.command,
            Some(CliCommand::Voices {
                remote: false,
                engine: Some(Engine::Standard)
            })
        );
        assert!(Cli::try_parse_from(["vocably", "voices", "--engine", "turbo"]).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocably.toml");
        std::fs::write(&path, "download_dir = \"/tmp/vocably\"\nlog_level = \"debug\"\n").unwrap();
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.download_dir, PathBuf::from("/tmp/vocably"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));

        assert!(Config::load("/nonexistent/vocably.toml").is_err());
    }
}
