pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod console;
pub mod error;
pub mod media;
pub mod session;
pub mod speech;
pub mod synthesis;
pub mod version;

pub use error::VocablyError;
