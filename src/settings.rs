//! Player profile and preferences
//!
//! Persisted under its own key, separate from progress and scores.

use serde::{Deserialize, Serialize};

use crate::persistence::{self, KeyValueStore, keys};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Sound cues on/off
    pub audio: bool,
    /// Minimize flashes and transition effects
    pub reduced_motion: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: true,
            reduced_motion: false,
            master_volume: 0.2,
        }
    }
}

impl Settings {
    /// Volume actually applied to cues (respects the audio toggle)
    pub fn effective_volume(&self) -> f32 {
        if self.audio {
            self.master_volume.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Player profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub settings: Settings,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            settings: Settings::default(),
        }
    }
}

impl Profile {
    /// Load the profile, writing the normalized copy back
    pub fn load<S: KeyValueStore + ?Sized>(store: &mut S) -> Self {
        let mut profile: Profile = persistence::load(&*store, keys::PROFILE, Profile::default());
        if profile.name.trim().is_empty() {
            profile.name = Profile::default().name;
        }
        profile.settings.master_volume = profile.settings.master_volume.clamp(0.0, 1.0);
        profile.save(store);
        profile
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) {
        persistence::save(store, keys::PROFILE, self);
        log::debug!("Profile saved");
    }
}
