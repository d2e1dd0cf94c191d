use reqwest::StatusCode;
use thiserror::Error;

pub const MSG_EMPTY_TEXT: &str = "Please enter some text to convert to speech.";
pub const MSG_MISSING_CREDENTIALS: &str = "Please enter a username and password.";
pub const MSG_INVALID_CREDENTIALS: &str = "Invalid username or password.";
pub const MSG_LOGIN_FAILED: &str = "Login failed. Please try again.";
pub const MSG_SERVER_STARTING: &str = "Server is starting up. Please wait 1-2 minutes and try again.";
pub const MSG_LOGIN_UNREACHABLE: &str = "Cannot connect to server. Check your connection and try again.";
pub const MSG_TTS_UNREACHABLE: &str =
    "Cannot connect to TTS server. Make sure the backend is running.";

/// Every failure a user can see. `Display` is the message shown to them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocablyError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("Session expired. Please log in again.")]
    SessionExpired,
    #[error("{0}")]
    Unreachable(String),
    #[error("{0}")]
    Timeout(String),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("Received malformed audio from server: {0}")]
    InvalidAudio(String),
    #[error("Failed to play audio.")]
    Playback(String),
    #[error("No audio to download. Generate speech first.")]
    NoAudio,
    #[error("Speech synthesis already in progress.")]
    Busy,
    #[error("{0}")]
    Io(String),
}

impl VocablyError {
    pub fn empty_text() -> Self {
        Self::Validation(MSG_EMPTY_TEXT.to_string())
    }

    /// Builds the error for a non-success reply, preferring the server's own
    /// `detail` over the generic status text.
    pub fn server(status: StatusCode, detail: Option<String>) -> Self {
        let message = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
        Self::Server {
            status: status.as_u16(),
            message,
        }
    }
}

impl From<std::io::Error> for VocablyError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(format!("Failed to save audio: {}", e))
    }
}

/// Error payload shared by every backend endpoint.
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Reads `{detail}` from a failed response. An unreadable body yields no detail.
    pub(crate) async fn read(response: reqwest::Response) -> Option<String> {
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        match body.detail? {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
