/// Payload decoding at the subscription boundary
///
/// Both the main topic and alias topics turn a raw payload into a [`Trigger`]
/// here, so handlers only ever see "play this sound" or "ignore".

use crate::alias::AliasBinding;
use crate::sound::SoundName;

/// Outcome of decoding one bus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Play(SoundName),
    Ignore(IgnoreReason),
}

/// Why a message did not trigger anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Main topic payload was empty
    Empty,

    /// Main topic payload was not UTF-8
    NotUtf8,

    /// Main topic payload failed the sound name pattern
    InvalidName(String),

    /// Alias payload did not equal the expected value
    ValueMismatch,
}

/// How a subscription maps payloads to sounds
#[derive(Debug, Clone)]
pub enum TriggerRule {
    /// Payload is the sound name
    SoundTopic,

    /// Payload gates a configured sound
    Alias(AliasBinding),
}

impl TriggerRule {
    pub fn decode(&self, payload: &[u8]) -> Trigger {
        match self {
            TriggerRule::SoundTopic => decode_sound_payload(payload),
            TriggerRule::Alias(binding) => {
                if binding.expected.accepts(payload) {
                    Trigger::Play(binding.sound.clone())
                } else {
                    Trigger::Ignore(IgnoreReason::ValueMismatch)
                }
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            TriggerRule::SoundTopic => "sound topic".to_string(),
            TriggerRule::Alias(binding) => {
                format!("alias {} == {} -> {}", binding.topic, binding.expected, binding.sound)
            }
        }
    }
}

fn decode_sound_payload(payload: &[u8]) -> Trigger {
    let text = match std::str::from_utf8(payload) {
        Ok(text) => text,
        Err(_) => return Trigger::Ignore(IgnoreReason::NotUtf8),
    };

    if text.is_empty() {
        return Trigger::Ignore(IgnoreReason::Empty);
    }

    match SoundName::parse(text) {
        Some(sound) => Trigger::Play(sound),
        None => Trigger::Ignore(IgnoreReason::InvalidName(text.to_string())),
    }
}
