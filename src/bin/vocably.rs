use anyhow::{anyhow, Result};
use clap::Parser;
use std::fs::File;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::select;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use vocably::{
    api::ApiEndpoint,
    auth::AuthClient,
    catalog::{find_example, find_tone, find_voice},
    config::{Cli, CliCommand, Config, PlayerKind},
    console::{render_voices, Shell, ShellMode},
    media::{AudioPlayer, PlaybackEventSender, ResourceRegistry, SilentPlayer, SystemPlayer},
    session::{SessionStorage, SessionStore},
    speech::SpeechController,
    synthesis::HttpSynthesisClient,
    version,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match cli.conf.as_deref() {
        Some(conf) => Config::load(conf)?,
        None => Config::default(),
    }
    .apply_env();
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }

    let level = config
        .log_level
        .as_deref()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::WARN);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let log_fmt = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _guard = match config.log_file {
        Some(ref log_file) => {
            let file = File::create(log_file)
                .map_err(|e| anyhow!("failed to create log file {}: {}", log_file, e))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            log_fmt
                .with_writer(non_blocking)
                .with_ansi(false)
                .try_init()
                .ok();
            Some(guard)
        }
        None => {
            log_fmt.try_init().ok();
            None
        }
    };

    let command = cli.command.unwrap_or(CliCommand::Shell);
    if command == CliCommand::CheckConfig {
        config.check()?;
        println!("{} config ok, backend {}", version::get_short_version(), config.backend_url);
        return Ok(());
    }
    config.check()?;
    info!("{} using backend {}", version::get_useragent(), config.backend_url);

    let endpoint = ApiEndpoint::new(&config.backend_url)?;
    let backend = HttpSynthesisClient::new(endpoint.clone());

    match command {
        CliCommand::Shell => run_shell(config, endpoint, backend).await,
        CliCommand::Speak {
            text,
            example,
            voice,
            tone,
            username,
            password,
            output_dir,
            play,
        } => {
            let request = SpeakArgs {
                text,
                example,
                voice,
                tone,
                output_dir,
                play,
            };
            speak(config, endpoint, backend, &username, &password, request).await
        }
        CliCommand::Voices {
            remote: false,
            engine,
        } => {
            println!("{}", render_voices(engine));
            Ok(())
        }
        CliCommand::Voices { remote: true, .. } => {
            for voice in backend.voices().await? {
                println!("  {:<10} ({})", voice.name, voice.id);
            }
            Ok(())
        }
        CliCommand::Health => {
            let status = backend.health().await?;
            println!(
                "backend {}: {} ({} speakers)",
                status.status,
                status.model.as_deref().unwrap_or("unknown model"),
                status.speakers.len()
            );
            Ok(())
        }
        CliCommand::CheckConfig => Ok(()),
    }
}

fn build_player(config: &Config, events: PlaybackEventSender) -> Result<Box<dyn AudioPlayer>> {
    match config.player {
        PlayerKind::System => Ok(Box::new(SystemPlayer::new(
            config.player_command.as_deref(),
            events,
        ))),
        PlayerKind::Silent => Ok(Box::new(SilentPlayer::new(events))),
        #[cfg(feature = "playback-cpal")]
        PlayerKind::Cpal => Ok(Box::new(vocably::media::cpal_player::CpalPlayer::new(
            events,
        ))),
        #[cfg(not(feature = "playback-cpal"))]
        PlayerKind::Cpal => Err(anyhow!(
            "player = \"cpal\" requires the playback-cpal feature"
        )),
    }
}

fn build_speech(
    config: &Config,
    backend: &HttpSynthesisClient,
    store: SessionStore,
    player: Box<dyn AudioPlayer>,
) -> SpeechController {
    let mut speech = SpeechController::new(
        Arc::new(backend.clone()),
        store,
        ResourceRegistry::new(),
        player,
    );
    speech.set_voice(&config.voice);
    speech.set_language(&config.language);
    speech
}

async fn run_shell(
    config: Config,
    endpoint: ApiEndpoint,
    backend: HttpSynthesisClient,
) -> Result<()> {
    let store = SessionStore::new(SessionStorage::new());
    let auth = AuthClient::new(endpoint, store.clone()).with_login_timeout(config.login_timeout());
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let speech = build_speech(&config, &backend, store, build_player(&config, tx)?);

    let mode = if std::io::stdin().is_terminal() {
        ShellMode::Interactive
    } else {
        ShellMode::Script
    };
    let mut shell = Shell::new(auth, speech, backend, rx, config.download_dir.clone(), mode);
    select! {
        r = shell.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()) => r?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received CTRL+C, shutting down");
        }
    }
    Ok(())
}

struct SpeakArgs {
    text: Option<String>,
    example: Option<String>,
    voice: Option<String>,
    tone: Option<String>,
    output_dir: Option<PathBuf>,
    play: bool,
}

async fn speak(
    config: Config,
    endpoint: ApiEndpoint,
    backend: HttpSynthesisClient,
    username: &str,
    password: &str,
    args: SpeakArgs,
) -> Result<()> {
    let store = SessionStore::new(SessionStorage::new());
    let mut auth =
        AuthClient::new(endpoint, store.clone()).with_login_timeout(config.login_timeout());
    auth.login(username, password).await?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let player = if args.play {
        build_player(&config, tx)?
    } else {
        Box::new(SilentPlayer::new(tx))
    };
    let mut speech = build_speech(&config, &backend, store, player);

    if let Some(voice) = args.voice.as_deref() {
        let voice = find_voice(voice).ok_or_else(|| anyhow!("unknown voice: {}", voice))?;
        speech.set_voice(voice.name);
    }
    if let Some(tone) = args.tone.as_deref() {
        let tone = find_tone(tone).ok_or_else(|| anyhow!("unknown tone: {}", tone))?;
        speech.apply_tone(tone);
    }
    match (args.text.as_deref(), args.example.as_deref()) {
        (Some(text), _) => speech.set_text(text),
        (None, Some(id)) => {
            let example = find_example(id).ok_or_else(|| anyhow!("unknown example: {}", id))?;
            speech.apply_example(example);
        }
        (None, None) => {}
    }

    speech.request_speech().await?;

    let dir = args.output_dir.unwrap_or_else(|| config.download_dir.clone());
    let path = speech.download_result(&dir).await?;
    println!("{}", path.display());

    while speech.is_playing() {
        select! {
            event = rx.recv() => match event {
                Some(event) => speech.handle_playback_event(event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                speech.stop_playback();
                break;
            }
        }
    }
    if let Some(reason) = speech.state().error() {
        return Err(anyhow!("{}", reason));
    }
    Ok(())
}
