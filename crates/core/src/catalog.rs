//! Visual style presets and narration voices offered by the providers.

use serde::Serialize;

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StylePreset {
    pub name: &'static str,
    pub uuid: &'static str,
}

pub const STYLE_PRESETS: &[StylePreset] = &[
    StylePreset {
        name: "Dynamic",
        uuid: "111dc692-d470-4eec-b791-3475abac4c46",
    },
    StylePreset {
        name: "3D Render",
        uuid: "debdf72a-91a4-467b-bf61-cc02bdeb69c6",
    },
    StylePreset {
        name: "Cinematic",
        uuid: "5632c7c-ddbb-4e2f-ba34-8456ab3ac436",
    },
    StylePreset {
        name: "Creative",
        uuid: "6fedbf1f-4a17-45ec-84fb-92fe524a29ef",
    },
    StylePreset {
        name: "HDR",
        uuid: "97c20e5c-1af6-4d42-b227-54d03d8f0727",
    },
    StylePreset {
        name: "Vibrant",
        uuid: "dee282d3-891f-4f73-ba02-7f8131e5541b",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub id: &'static str,
    pub name: &'static str,
    pub gender: VoiceGender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoiceModel {
    pub id: &'static str,
    pub name: &'static str,
}

pub const DEFAULT_VOICE_MODEL: &str = "eleven_multilingual_v2";

pub const VOICE_MODELS: &[VoiceModel] = &[
    VoiceModel {
        id: "eleven_english_v1",
        name: "Eleven English v1",
    },
    VoiceModel {
        id: "eleven_multilingual_v1",
        name: "Eleven Multilingual v1",
    },
    VoiceModel {
        id: "eleven_turbo_v1",
        name: "Eleven Turbo v1",
    },
    VoiceModel {
        id: "eleven_turbo_v2",
        name: "Eleven Turbo v2.5",
    },
    VoiceModel {
        id: "eleven_multilingual_v2",
        name: "Eleven Multilingual v2",
    },
];

use VoiceGender::{Female, Male};

pub const VOICES: &[Voice] = &[
    Voice {
        id: "EiNlNiXeDU1pqqOPrYMO",
        name: "John Doe - Deep",
        gender: Male,
    },
    Voice {
        id: "pNInz6obpgDQGcFmaJgB",
        name: "Arnold (Legacy)",
        gender: Male,
    },
    Voice {
        id: "pqHfZKP75CvOlQylNhV4",
        name: "Bill",
        gender: Male,
    },
    Voice {
        id: "nPczCjzI2devNBz1zQrb",
        name: "Brian",
        gender: Male,
    },
    Voice {
        id: "N2lVS1w4EtoT3dr4eOWO",
        name: "Callum",
        gender: Male,
    },
    Voice {
        id: "IKne3meq5aSn9XLyUdCD",
        name: "Charlie",
        gender: Male,
    },
    Voice {
        id: "XB0fDUnXU5powFXDhCwa",
        name: "Charlotte",
        gender: Female,
    },
    Voice {
        id: "iP95p4xoKVk53GoZ742B",
        name: "Chris",
        gender: Male,
    },
    Voice {
        id: "onwK4e9ZLuTAKqWW03F9",
        name: "Daniel",
        gender: Male,
    },
    Voice {
        id: "cjVigY5qzO86Huf0OWal",
        name: "Eric",
        gender: Male,
    },
    Voice {
        id: "JBFqnCBsd6RMkjVDRZzb",
        name: "George",
        gender: Male,
    },
    Voice {
        id: "cgSgspJ2msm6clMCkdW9",
        name: "Jessica",
        gender: Female,
    },
    Voice {
        id: "FGY2WhTYpPnrIDTdsKH5",
        name: "Laura",
        gender: Female,
    },
    Voice {
        id: "TX3LPaxmHKxFdv7VOQHJ",
        name: "Liam",
        gender: Male,
    },
    Voice {
        id: "pFZP5JQG7iQjIQuC4Bku",
        name: "Lily",
        gender: Female,
    },
    Voice {
        id: "XrExE9yKIg1WjnnlVkGX",
        name: "Matilda",
        gender: Female,
    },
    Voice {
        id: "SAz9YHcvj6GT2YYXdXww",
        name: "River",
        gender: Male,
    },
    Voice {
        id: "CwhRBWXzGAHq8TQ4Fs17",
        name: "Roger",
        gender: Male,
    },
    Voice {
        id: "EXAVITQu4vr4xnSDxMaL",
        name: "Sarah",
        gender: Female,
    },
    Voice {
        id: "bIHbv24MWmeRgasZH58o",
        name: "Will",
        gender: Male,
    },
];

/// Finds a voice by exact id or case-insensitive name.
pub fn find_voice(query: &str) -> Result<&'static Voice, ConfigurationError> {
    let query = query.trim();
    VOICES
        .iter()
        .find(|v| v.id == query)
        .or_else(|| VOICES.iter().find(|v| v.name.eq_ignore_ascii_case(query)))
        .ok_or_else(|| ConfigurationError::UnknownVoice(query.to_string()))
}

pub fn find_style_preset(name: &str) -> Option<&'static StylePreset> {
    STYLE_PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
}
