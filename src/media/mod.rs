use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

#[cfg(feature = "playback-cpal")]
pub mod cpal_player;
pub mod player;
pub mod wav;

pub use player::{
    AudioPlayer, PlaybackEvent, PlaybackEventKind, PlaybackEventReceiver, PlaybackEventSender,
    SilentPlayer, SystemPlayer,
};

pub const WAV_MIME: &str = "audio/wav";

/// Handle to bytes held in a [`ResourceRegistry`], addressed by its url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioResource {
    pub url: String,
    pub size: usize,
    pub mime: &'static str,
}

/// In-process stand-in for browser object URLs: bytes stay alive until the
/// url handed out by [`ResourceRegistry::create`] is revoked.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, data: impl Into<Bytes>, mime: &'static str) -> AudioResource {
        let data = data.into();
        let url = format!("blob:vocably/{}", Uuid::new_v4());
        let resource = AudioResource {
            url: url.clone(),
            size: data.len(),
            mime,
        };
        if let Ok(mut resources) = self.resources.lock() {
            resources.insert(url, data);
        }
        debug!(url = %resource.url, size = resource.size, "resource created");
        resource
    }

    pub fn fetch(&self, url: &str) -> Option<Bytes> {
        self.resources.lock().ok()?.get(url).cloned()
    }

    /// Releases the bytes behind `url`. Revoking an unknown url is a no-op.
    pub fn revoke(&self, url: &str) {
        if let Ok(mut resources) = self.resources.lock() {
            if resources.remove(url).is_some() {
                debug!(url, "resource revoked");
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.resources.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fetch_revoke() {
        let registry = ResourceRegistry::new();
        let first = registry.create(vec![1u8, 2, 3], WAV_MIME);
        let second = registry.create(vec![4u8; 10], WAV_MIME);
        assert_ne!(first.url, second.url);
        assert!(first.url.starts_with("blob:vocably/"));
        assert_eq!(first.size, 3);
        assert_eq!(registry.live_count(), 2);

        assert_eq!(registry.fetch(&first.url).unwrap().as_ref(), &[1u8, 2, 3]);
        registry.revoke(&first.url);
        assert!(registry.fetch(&first.url).is_none());
        assert_eq!(registry.live_count(), 1);

        registry.revoke(&first.url);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = ResourceRegistry::new();
        let view = registry.clone();
        let resource = registry.create(Bytes::from_static(b"abc"), WAV_MIME);
        assert_eq!(view.live_count(), 1);
        view.revoke(&resource.url);
        assert_eq!(registry.live_count(), 0);
    }
}
