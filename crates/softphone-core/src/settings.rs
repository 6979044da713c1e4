use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_DISPLAY_NAME, DEFAULT_REGISTRATION_EXPIRES, StackConfig};
use crate::transport::CallAudioConfig;

pub const DEFAULT_RINGTONE: &str = "ringingtone.mp3";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PhoneSettings {
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_ringtone")]
    pub ringtone_path: String,
    #[serde(default = "default_true")]
    pub remote_autoplay: bool,
    #[serde(default = "default_registration_expires")]
    pub registration_expires: u32,
}

fn default_display_name() -> String {
    DEFAULT_DISPLAY_NAME.to_string()
}

fn default_ringtone() -> String {
    DEFAULT_RINGTONE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_registration_expires() -> u32 {
    DEFAULT_REGISTRATION_EXPIRES
}

impl Default for PhoneSettings {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            ringtone_path: default_ringtone(),
            remote_autoplay: true,
            registration_expires: DEFAULT_REGISTRATION_EXPIRES,
        }
    }
}

impl PhoneSettings {
    /// Audio configuration applied to every call session.
    pub fn call_audio(&self) -> CallAudioConfig {
        CallAudioConfig {
            remote_autoplay: self.remote_autoplay,
        }
    }

    /// Overlay the user preferences onto a stack config.
    pub fn apply_to(&self, config: &mut StackConfig) {
        config.display_name = self.display_name.clone();
        config.registration_expires = self.registration_expires;
    }
}

/// Persists [`PhoneSettings`] as `settings.json` under a data directory.
pub struct SettingsStore {
    settings: Mutex<PhoneSettings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &str) -> Self {
        let file_path = PathBuf::from(data_dir).join("settings.json");
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> PhoneSettings {
        self.settings.lock().unwrap().clone()
    }

    pub fn set_display_name(&self, name: String) {
        self.settings.lock().unwrap().display_name = name;
        self.save();
    }

    pub fn set_ringtone_path(&self, path: String) {
        self.settings.lock().unwrap().ringtone_path = path;
        self.save();
    }

    pub fn set_remote_autoplay(&self, enabled: bool) {
        self.settings.lock().unwrap().remote_autoplay = enabled;
        self.save();
    }

    pub fn set_registration_expires(&self, seconds: u32) {
        self.settings.lock().unwrap().registration_expires = seconds;
        self.save();
    }

    fn save(&self) {
        let settings = self.settings.lock().unwrap().clone();
        if let Some(parent) = self.file_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("settings dir {}: {e}", parent.display());
            }
        }
        match serde_json::to_string_pretty(&settings) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.file_path, json) {
                    tracing::warn!("failed to write settings: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize settings: {e}"),
        }
    }

    fn load(path: &PathBuf) -> PhoneSettings {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("corrupt settings file, using defaults: {e}");
                PhoneSettings::default()
            }),
            Err(_) => PhoneSettings::default(),
        }
    }
}
