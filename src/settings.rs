use color_eyre::eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::store::{KeyValueStore, Namespace};

pub const TARGET_PLAYLIST_KEY: &str = "target_playlist";

/// User preferences, every absent key takes its default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub enable_smart_matching: bool,
    pub auto_add_liked: bool,
    pub enable_notifications: bool,
    pub enable_success_notifications: bool,
    pub enable_error_notifications: bool,
    /// Seconds before an API request is abandoned
    pub api_timeout: u64,
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_smart_matching: true,
            auto_add_liked: true,
            enable_notifications: true,
            enable_success_notifications: true,
            enable_error_notifications: true,
            api_timeout: 10,
            max_retries: 2,
        }
    }
}

impl Settings {
    pub const API_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=60;
    pub const MAX_RETRIES: u32 = 5;

    const KEYS: [&'static str; 7] = [
        "enable_smart_matching",
        "auto_add_liked",
        "enable_notifications",
        "enable_success_notifications",
        "enable_error_notifications",
        "api_timeout",
        "max_retries",
    ];

    pub async fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let mut settings = serde_json::to_value(Self::default())?;
        for key in Self::KEYS {
            if let Some(value) = store.get(Namespace::Sync, key).await? {
                settings[key] = value;
            }
        }
        let mut settings: Self = serde_json::from_value(settings)?;
        // hand-edited files may hold values `set` would refuse
        settings.api_timeout = settings.api_timeout.clamp(
            *Self::API_TIMEOUT_RANGE.start(),
            *Self::API_TIMEOUT_RANGE.end(),
        );
        settings.max_retries = settings.max_retries.min(Self::MAX_RETRIES);
        Ok(settings)
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let Value::Object(map) = serde_json::to_value(self)? else {
            return Err(eyre!("settings did not serialize to an object"));
        };
        let items = map
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect::<Vec<_>>();
        store.set_many(Namespace::Sync, items).await?;
        Ok(())
    }

    /// Update a single setting from its textual form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parse_bool = |v: &str| {
            v.parse::<bool>()
                .map_err(|_| eyre!("expected true or false for {}, got {:?}", key, v))
        };
        match key {
            "enable_smart_matching" => self.enable_smart_matching = parse_bool(value)?,
            "auto_add_liked" => self.auto_add_liked = parse_bool(value)?,
            "enable_notifications" => self.enable_notifications = parse_bool(value)?,
            "enable_success_notifications" => self.enable_success_notifications = parse_bool(value)?,
            "enable_error_notifications" => self.enable_error_notifications = parse_bool(value)?,
            "api_timeout" => {
                let secs: u64 = value.parse()?;
                if !Self::API_TIMEOUT_RANGE.contains(&secs) {
                    return Err(eyre!("api_timeout must be between 1 and 60 seconds"));
                }
                self.api_timeout = secs;
            }
            "max_retries" => {
                let retries: u32 = value.parse()?;
                if retries > Self::MAX_RETRIES {
                    return Err(eyre!("max_retries must be between 0 and 5"));
                }
                self.max_retries = retries;
            }
            _ => return Err(eyre!("unknown setting: {}", key)),
        }
        Ok(())
    }

    /// Whether a notification of the given outcome should be shown
    pub fn notify(&self, success: bool) -> bool {
        self.enable_notifications
            && if success {
                self.enable_success_notifications
            } else {
                self.enable_error_notifications
            }
    }

    /// Wipe the whole durable namespace: settings, tokens and target playlist
    pub async fn reset_all(store: &dyn KeyValueStore) -> Result<()> {
        store.clear(Namespace::Sync).await?;
        info!("all settings reset to defaults");
        Ok(())
    }
}

/// Playlist songs are added to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPlaylist {
    pub id: String,
    pub name: String,
}

impl TargetPlaylist {
    pub async fn load(store: &dyn KeyValueStore) -> Result<Option<Self>> {
        match store.get(Namespace::Sync, TARGET_PLAYLIST_KEY).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        store
            .set(Namespace::Sync, TARGET_PLAYLIST_KEY, serde_json::to_value(self)?)
            .await?;
        Ok(())
    }

    pub async fn clear(store: &dyn KeyValueStore) -> Result<()> {
        store.remove(Namespace::Sync, &[TARGET_PLAYLIST_KEY]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn absent_keys_take_defaults() {
        let store = MemoryStore::default();
        store.set(Namespace::Sync, "max_retries", json!(4)).await.unwrap();

        let settings = Settings::load(&store).await.unwrap();
        assert_eq!(settings.max_retries, 4);
        assert_eq!(settings.api_timeout, 10);
        assert!(settings.enable_smart_matching);
    }

    #[tokio::test]
    async fn out_of_range_values_are_clamped_on_load() {
        let store = MemoryStore::default();
        store.set(Namespace::Sync, "max_retries", json!(64)).await.unwrap();
        store.set(Namespace::Sync, "api_timeout", json!(0)).await.unwrap();

        let settings = Settings::load(&store).await.unwrap();
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.api_timeout, 1);

        store.set(Namespace::Sync, "api_timeout", json!(3600)).await.unwrap();
        assert_eq!(Settings::load(&store).await.unwrap().api_timeout, 60);
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = MemoryStore::default();
        let mut settings = Settings::default();
        settings.set("enable_smart_matching", "false").unwrap();
        settings.set("api_timeout", "30").unwrap();
        settings.save(&store).await.unwrap();

        assert_eq!(Settings::load(&store).await.unwrap(), settings);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut settings = Settings::default();
        assert!(settings.set("api_timeout", "0").is_err());
        assert!(settings.set("max_retries", "9").is_err());
        assert!(settings.set("enable_notifications", "yes").is_err());
        assert!(settings.set("volume", "11").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn notifications_respect_master_switch() {
        let mut settings = Settings::default();
        assert!(settings.notify(true));
        settings.enable_error_notifications = false;
        assert!(!settings.notify(false));
        settings.enable_notifications = false;
        assert!(!settings.notify(true));
    }

    #[tokio::test]
    async fn reset_drops_target_playlist() {
        let store = MemoryStore::default();
        let target = TargetPlaylist {
            id: "37i9dQZF1DXcBWIGoYBM5M".to_string(),
            name: "Today's Top Hits".to_string(),
        };
        target.save(&store).await.unwrap();
        assert_eq!(TargetPlaylist::load(&store).await.unwrap(), Some(target));

        Settings::reset_all(&store).await.unwrap();
        assert_eq!(TargetPlaylist::load(&store).await.unwrap(), None);
    }
}
