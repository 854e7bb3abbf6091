//! Player preferences persisted through a [`SettingsStore`].

use comet_config::{ConfigError, SettingsStore};
use rand::Rng;

pub const KEY_PLAYER_NAME: &str = "player_name";
pub const KEY_REGION: &str = "region";
pub const KEY_MUTED: &str = "muted";

/// A fresh `Pilot####` name.
pub fn default_player_name() -> String {
    let mut rng = rand::rng();
    format!("Pilot{:04}", rng.random_range(0..10_000))
}

/// Typed view over the raw key/value store.
pub struct Preferences {
    store: Box<dyn SettingsStore>,
}

impl Preferences {
    pub fn new(store: Box<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Stored player name. A missing or blank name is replaced by a
    /// generated one, which is persisted so later calls agree.
    pub fn player_name(&mut self) -> String {
        if let Some(name) = self.stored(KEY_PLAYER_NAME) {
            return name;
        }
        let name = default_player_name();
        if let Err(e) = self.store.set(KEY_PLAYER_NAME, &name) {
            tracing::warn!(error = %e, "failed to persist generated player name");
        }
        name
    }

    /// Store `name`. A blank name clears the entry.
    pub fn set_player_name(&mut self, name: &str) -> Result<(), ConfigError> {
        self.set_or_clear(KEY_PLAYER_NAME, name)
    }

    /// Preferred region, if one was chosen.
    pub fn region(&self) -> Option<String> {
        self.stored(KEY_REGION)
    }

    /// Store `region`. A blank region clears the preference.
    pub fn set_region(&mut self, region: &str) -> Result<(), ConfigError> {
        self.set_or_clear(KEY_REGION, region)
    }

    pub fn muted(&self) -> bool {
        self.store.get(KEY_MUTED).as_deref() == Some("true")
    }

    pub fn set_muted(&mut self, muted: bool) -> Result<(), ConfigError> {
        self.store.set(KEY_MUTED, if muted { "true" } else { "false" })
    }

    fn stored(&self, key: &str) -> Option<String> {
        self.store
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn set_or_clear(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            self.store.remove(key)
        } else {
            self.store.set(key, value)
        }
    }
}
