/// Alias bindings
///
/// An alias maps an extra topic filter to a fixed sound name, optionally gated
/// on an exact payload value.

use crate::sound::SoundName;

/// Payload gate of an alias binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedValue {
    /// Every message on the topic triggers the sound
    Any,

    /// Only messages whose decoded payload equals this value trigger
    Exactly(String),
}

impl ExpectedValue {
    /// Configuration sentinel meaning "match any payload"
    pub const WILDCARD: &'static str = "*";

    /// Interpret the optional `value` field of an alias entry.
    pub fn from_config(value: Option<&str>) -> Self {
        match value {
            None | Some(Self::WILDCARD) => ExpectedValue::Any,
            Some(v) => ExpectedValue::Exactly(v.to_string()),
        }
    }

    /// Check a raw payload against the gate.
    ///
    /// Payloads that are not valid UTF-8 only pass the `Any` gate.
    pub fn accepts(&self, payload: &[u8]) -> bool {
        match self {
            ExpectedValue::Any => true,
            ExpectedValue::Exactly(expected) => std::str::from_utf8(payload)
                .map(|text| text == expected)
                .unwrap_or(false),
        }
    }
}

impl std::fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedValue::Any => f.write_str(Self::WILDCARD),
            ExpectedValue::Exactly(v) => f.write_str(v),
        }
    }
}

/// A configured (sound, topic filter, payload gate) tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasBinding {
    pub sound: SoundName,
    pub topic: String,
    pub expected: ExpectedValue,
}
