//! Session participants
//!
//! A participant's visual state is one `DisplayState`; muting, speaking,
//! spotlight and screen sharing are orthogonal flags on top of it.

use serde::{Deserialize, Serialize};

use crate::channel::ParticipantInfo;
use crate::media::MediaStream;
use crate::types::ParticipantId;

/// Coarse connection quality reported for a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkQuality {
    Good,
    Medium,
    Poor,
}

impl NetworkQuality {
    /// Number of lit bars in a three-bar indicator
    pub fn bars(self) -> u8 {
        match self {
            NetworkQuality::Good => 3,
            NetworkQuality::Medium => 2,
            NetworkQuality::Poor => 1,
        }
    }
}

/// What a participant's tile shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayState {
    /// Media is still being set up
    Loading,
    VideoActive,
    VideoOff,
    /// Media could not be shown
    Error,
}

/// One member of a session
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Stream to render; the session manager owns the tracks
    pub stream: Option<MediaStream>,
    pub display: DisplayState,
    pub muted: bool,
    pub speaking: bool,
    pub spotlighted: bool,
    pub screen_sharing: bool,
    /// Current audio level in `0.0..=1.0`
    pub audio_level: Option<f32>,
    pub network_quality: Option<NetworkQuality>,
}

impl Participant {
    /// The local participant, bound to freshly acquired camera media
    pub fn local(name: impl Into<String>, stream: MediaStream) -> Self {
        Self {
            id: ParticipantId::local(),
            name: name.into(),
            stream: Some(stream),
            display: DisplayState::VideoActive,
            muted: false,
            speaking: false,
            spotlighted: false,
            screen_sharing: false,
            audio_level: None,
            network_quality: None,
        }
    }

    /// A remote participant announced by an event source
    pub fn remote(info: &ParticipantInfo) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            stream: None,
            display: if info.video_off {
                DisplayState::VideoOff
            } else {
                DisplayState::VideoActive
            },
            muted: info.muted,
            speaking: false,
            spotlighted: false,
            screen_sharing: false,
            audio_level: None,
            network_quality: info.network_quality,
        }
    }

    pub fn is_local(&self) -> bool {
        self.id.is_local()
    }

    pub fn is_video_off(&self) -> bool {
        self.display == DisplayState::VideoOff
    }

    pub fn set_video_off(&mut self, video_off: bool) {
        self.display = if video_off {
            DisplayState::VideoOff
        } else {
            DisplayState::VideoActive
        };
    }

    /// Mute and drop any speaking state that depended on open audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            self.speaking = false;
            self.audio_level = None;
        }
    }

    /// Whether the speaking indicator should be shown
    pub fn is_audibly_speaking(&self) -> bool {
        self.speaking && !self.muted
    }

    /// Width of the audio level bar, in percent
    pub fn audio_level_percent(&self) -> u8 {
        match self.audio_level {
            Some(level) if !self.muted => (level.clamp(0.0, 1.0) * 100.0).round() as u8,
            _ => 0,
        }
    }

    /// Lit bars of the network indicator; zero when unknown
    pub fn network_bars(&self) -> u8 {
        self.network_quality.map(NetworkQuality::bars).unwrap_or(0)
    }

    /// Letter shown in place of video
    pub fn avatar_initial(&self) -> Option<char> {
        self.name.chars().next().map(|c| {
            c.to_uppercase().next().unwrap_or(c)
        })
    }
}
