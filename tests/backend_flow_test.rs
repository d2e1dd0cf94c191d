use anyhow::Result;
use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use base64::prelude::*;
use dotenv::dotenv;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing::info;
use vocably::{
    api::ApiEndpoint,
    auth::AuthClient,
    config::{PASSWORD_ENV, USERNAME_ENV},
    media::{ResourceRegistry, SilentPlayer},
    session::{SessionStorage, SessionStore},
    speech::{SpeechController, SpeechState},
    synthesis::HttpSynthesisClient,
    VocablyError,
};

fn hello_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 24000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for n in 0..2400 {
            let t = n as f32 / 24000.0;
            let sample = (t * 220.0 * 2.0 * std::f32::consts::PI).sin() * 0.3;
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[derive(Default)]
struct Seen {
    requests: Vec<Value>,
    authorization: Vec<Option<String>>,
}

async fn spawn_backend(audio: Vec<u8>) -> (String, Arc<Mutex<Seen>>) {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let tts_seen = seen.clone();
    let app = Router::new()
        .route(
            "/login",
            post(|Json(body): Json<Value>| async move {
                if body["username"] == "vocably" && body["password"] == "vocably2026" {
                    (
                        StatusCode::OK,
                        Json(json!({"access_token": "token-abc", "token_type": "bearer"})),
                    )
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"detail": "Invalid username or password."})),
                    )
                }
            }),
        )
        .route(
            "/api/tts",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = tts_seen.clone();
                let audio = audio.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let mut seen = seen.lock().unwrap();
                    seen.requests.push(body);
                    seen.authorization.push(auth.clone());
                    if auth.as_deref() != Some("Bearer token-abc") {
                        return (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({"detail": "Not authenticated"})),
                        );
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "audio_base64": BASE64_STANDARD.encode(&audio),
                            "sample_rate": 24000,
                            "format": "wav"
                        })),
                    )
                }
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), seen)
}

#[tokio::test]
async fn test_login_then_synthesize_hello() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let audio = hello_wav();
    let (base, seen) = spawn_backend(audio.clone()).await;

    let endpoint = ApiEndpoint::new(&base)?;
    let store = SessionStore::new(SessionStorage::new());
    let mut auth = AuthClient::new(endpoint.clone(), store.clone());
    auth.login("vocably", "vocably2026").await?;
    assert!(auth.is_authenticated());
    assert_eq!(store.get().as_deref(), Some("token-abc"));

    let registry = ResourceRegistry::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut speech = SpeechController::new(
        Arc::new(HttpSynthesisClient::new(endpoint)),
        store,
        registry.clone(),
        Box::new(SilentPlayer::new(tx)),
    );
    speech.set_text("Hello");
    speech.request_speech().await?;
    assert_eq!(speech.state(), &SpeechState::Playing);

    let resource = speech.result().cloned().expect("a playable result");
    assert_eq!(resource.size, audio.len());
    assert_eq!(registry.fetch(&resource.url).as_deref(), Some(audio.as_slice()));
    assert_eq!(registry.live_count(), 1);

    {
        let seen = seen.lock().unwrap();
        assert_eq!(
            seen.requests[0],
            json!({"text": "Hello", "voice": "Vivian", "language": "Auto", "instruct": null})
        );
        assert_eq!(seen.authorization[0].as_deref(), Some("Bearer token-abc"));
    }

    let event = rx.recv().await.expect("playback event");
    speech.handle_playback_event(event);
    assert_eq!(speech.state(), &SpeechState::Idle);

    let dir = tempfile::tempdir()?;
    let path = speech.download_result(dir.path()).await?;
    assert_eq!(std::fs::read(&path)?, audio);
    info!("saved {}", path.display());

    drop(speech);
    assert_eq!(registry.live_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_logout_then_synthesis_is_rejected() -> Result<()> {
    let (base, seen) = spawn_backend(hello_wav()).await;
    let endpoint = ApiEndpoint::new(&base)?;
    let store = SessionStore::new(SessionStorage::new());
    let mut auth = AuthClient::new(endpoint.clone(), store.clone());
    auth.login("vocably", "vocably2026").await?;
    auth.logout();
    assert!(!auth.is_authenticated());

    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let mut speech = SpeechController::new(
        Arc::new(HttpSynthesisClient::new(endpoint)),
        store,
        ResourceRegistry::new(),
        Box::new(SilentPlayer::new(tx)),
    );
    let err = speech.request_speech().await.unwrap_err();
    assert_eq!(err, VocablyError::SessionExpired);
    assert_eq!(
        speech.state().error(),
        Some("Session expired. Please log in again.")
    );
    assert!(!speech.has_result());
    assert_eq!(seen.lock().unwrap().authorization[0], None);
    Ok(())
}

// Runs against a real backend when VOCABLY_BACKEND_URL and credentials are set.
#[tokio::test]
async fn test_live_backend() -> Result<()> {
    let _ = dotenv();
    let (Ok(base), Ok(username), Ok(password)) = (
        std::env::var("VOCABLY_BACKEND_URL"),
        std::env::var(USERNAME_ENV),
        std::env::var(PASSWORD_ENV),
    ) else {
        println!("live backend not configured, skipping");
        return Ok(());
    };

    let endpoint = ApiEndpoint::new(&base)?;
    let status = HttpSynthesisClient::new(endpoint.clone()).health().await?;
    println!("backend {} {:?}", status.status, status.model);

    let store = SessionStore::new(SessionStorage::new());
    let mut auth = AuthClient::new(endpoint.clone(), store.clone());
    auth.login(&username, &password).await?;

    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let mut speech = SpeechController::new(
        Arc::new(HttpSynthesisClient::new(endpoint)),
        store,
        ResourceRegistry::new(),
        Box::new(SilentPlayer::new(tx)),
    );
    speech.set_text("Hello");
    speech.request_speech().await?;
    assert!(speech.result().map(|r| r.size > 44).unwrap_or(false));
    Ok(())
}
