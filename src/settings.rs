//! Audio preferences and unlock timing
//!
//! Persisted in LocalStorage on the web. Everything has a sensible default so
//! a missing or corrupt entry never blocks startup.

use serde::{Deserialize, Serialize};

/// Which unlock timing profile to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeviceClass {
    /// Trust the platform's hint
    #[default]
    Auto,
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Auto => "Auto",
            DeviceClass::Mobile => "Mobile",
            DeviceClass::Desktop => "Desktop",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(DeviceClass::Auto),
            "mobile" | "phone" | "tablet" => Some(DeviceClass::Mobile),
            "desktop" => Some(DeviceClass::Desktop),
            _ => None,
        }
    }

    /// Resolve against the platform hint
    pub fn is_mobile(&self, platform_hint: bool) -> bool {
        match self {
            DeviceClass::Auto => platform_hint,
            DeviceClass::Mobile => true,
            DeviceClass::Desktop => false,
        }
    }
}

/// Delays and retry budget for one device class
///
/// Fields missing from stored JSON fall back to the desktop profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockTiming {
    /// Wait after marking the device ready
    pub stabilize_ms: u32,
    /// Extra wait after an explicit resume of a suspended device
    pub resume_wait_ms: u32,
    /// Content generation attempts before giving up
    pub attempts: u32,
    /// Wait between failed attempts
    pub backoff_ms: u32,
}

impl UnlockTiming {
    pub const MOBILE: Self = Self {
        stabilize_ms: 300,
        resume_wait_ms: 200,
        attempts: 5,
        backoff_ms: 500,
    };

    pub const DESKTOP: Self = Self {
        stabilize_ms: 100,
        resume_wait_ms: 50,
        attempts: 3,
        backoff_ms: 200,
    };
}

impl Default for UnlockTiming {
    fn default() -> Self {
        Self::DESKTOP
    }
}

/// Timing profiles for both device classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockProfiles {
    pub mobile: UnlockTiming,
    pub desktop: UnlockTiming,
}

impl Default for UnlockProfiles {
    fn default() -> Self {
        Self {
            mobile: UnlockTiming::MOBILE,
            desktop: UnlockTiming::DESKTOP,
        }
    }
}

impl UnlockProfiles {
    pub fn select(&self, mobile: bool) -> UnlockTiming {
        if mobile { self.mobile } else { self.desktop }
    }
}

/// Gain levels for the mix graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Music bus volume (0.0 - 1.0)
    pub music_volume: f32,
    /// Sound effects bus volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Silence everything without tearing the graph down
    pub muted: bool,
    pub device_class: DeviceClass,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: 0.9,
            music_volume: 0.7,
            sfx_volume: 1.0,
            muted: false,
            device_class: DeviceClass::Auto,
        }
    }
}

impl AudioSettings {
    /// Master gain after mute is applied
    pub fn effective_master(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume.clamp(0.0, 1.0) }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub unlock: UnlockProfiles,
}

impl Settings {
    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "paddle_rally_settings";

    /// Parse settings injected by the host page
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Timing profile for the resolved device class
    pub fn unlock_timing(&self, platform_hint: bool) -> UnlockTiming {
        self.unlock
            .select(self.audio.device_class.is_mobile(platform_hint))
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(err) => log::warn!("Ignoring stored settings: {}", err),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

/// Device class override from a page query string such as `?device=mobile`
pub fn device_class_from_query(query: &str) -> Option<DeviceClass> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "device")
        .and_then(|(_, value)| DeviceClass::from_str(value))
}

/// User-agent signatures treated as mobile
const MOBILE_UA_MARKERS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "mobile",
    "webos",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Heuristic mobile check on a user-agent string
///
/// Only a hint; `DeviceClass` overrides it.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    MOBILE_UA_MARKERS.iter().any(|marker| ua.contains(marker))
}
