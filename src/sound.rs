use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Pattern a sound name must match when it arrives as a raw bus payload
pub const SOUND_NAME_PATTERN: &str = "^[a-zA-Z0-9]+$";

fn sound_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(SOUND_NAME_PATTERN).expect("sound name pattern is valid"))
}

/// Logical identifier of a playable sound.
///
/// Names taken from the bus go through [`SoundName::parse`]; names taken from
/// configuration are trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SoundName(String);

impl SoundName {
    /// Validate an untrusted name against [`SOUND_NAME_PATTERN`].
    pub fn parse(raw: &str) -> Option<Self> {
        if sound_name_regex().is_match(raw) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    /// Wrap a name from configuration without validation.
    pub fn trusted(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_alphanumeric() {
        for name in ["beep", "Horn2", "42", "ABCxyz09"] {
            let sound = SoundName::parse(name).unwrap();
            assert_eq!(sound.as_str(), name);
        }
    }

    #[test]
    fn test_parse_rejects_everything_else() {
        for name in ["", " beep", "beep\n", "../etc", "a/b", "horn-2", "sirène", "a b"] {
            assert!(SoundName::parse(name).is_none(), "{:?} should be rejected", name);
        }
    }

    #[test]
    fn test_trusted_skips_validation() {
        let sound = SoundName::trusted("door bell");
        assert_eq!(sound.to_string(), "door bell");
    }
}
