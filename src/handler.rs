/// Trigger handler
///
/// One handler owns one subscription and processes its messages strictly in
/// arrival order: decode, resolve, play, wait for the player, next message.
/// Nothing a single message does can stop the loop; only the end of the
/// subscription does.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::messaging::{BusMessage, Subscription};
use crate::playback::Player;
use crate::resolver::SoundResolver;
use crate::sound::SoundName;
use crate::trigger::{IgnoreReason, Trigger, TriggerRule};

/// What happened to a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// A file was found and the player ran
    Played(PathBuf),

    /// The payload did not trigger anything
    Ignored(IgnoreReason),

    /// No file matches the sound
    NotFound(SoundName),

    /// Resolution or playback failed, already logged
    Failed,
}

/// Subscription loop for the sound topic or one alias
pub struct TriggerHandler {
    subscription: Subscription,
    rule: TriggerRule,
    resolver: SoundResolver,
    player: Arc<dyn Player>,
}

impl TriggerHandler {
    pub fn new(
        subscription: Subscription,
        rule: TriggerRule,
        resolver: SoundResolver,
        player: Arc<dyn Player>,
    ) -> Self {
        Self {
            subscription,
            rule,
            resolver,
            player,
        }
    }

    pub fn topic_filter(&self) -> &str {
        self.subscription.topic_filter()
    }

    /// Process messages until the subscription ends.
    ///
    /// The message stream is infinite while the bus is connected, so returning
    /// at all means the handler is dead and the error says why.
    pub fn run(mut self) -> Result<(), DispatchError> {
        tracing::debug!("Handler for {} ({}) started", self.topic_filter(), self.rule.description());

        while let Some(message) = self.subscription.next() {
            self.handle_message(&message);
        }

        Err(DispatchError::SubscriptionClosed {
            filter: self.topic_filter().to_string(),
            reason: self.subscription.end_reason(),
        })
    }

    pub fn handle_message(&self, message: &BusMessage) -> HandleOutcome {
        match self.rule.decode(&message.payload) {
            Trigger::Play(sound) => try_play_sound(&self.resolver, self.player.as_ref(), &sound),
            Trigger::Ignore(reason) => {
                log_ignored(&message.topic, &reason);
                HandleOutcome::Ignored(reason)
            }
        }
    }
}

/// Resolve a sound and play it, logging anything that goes wrong.
pub fn try_play_sound(resolver: &SoundResolver, player: &dyn Player, sound: &SoundName) -> HandleOutcome {
    tracing::debug!("trying to play: {}", sound);

    let file = match resolver.resolve(sound) {
        Ok(Some(file)) => file,
        Ok(None) => {
            tracing::debug!("could not play {}, no suitable file", sound);
            return HandleOutcome::NotFound(sound.clone());
        }
        Err(e) => {
            tracing::error!("Failed to resolve {}: {}", sound, e);
            return HandleOutcome::Failed;
        }
    };

    tracing::debug!("found for {}: {}", sound, file.display());

    match player.play(&file) {
        Ok(()) => HandleOutcome::Played(file),
        Err(e) => {
            tracing::error!("Failed to play {}: {}", file.display(), e);
            HandleOutcome::Failed
        }
    }
}

fn log_ignored(topic: &str, reason: &IgnoreReason) {
    match reason {
        IgnoreReason::Empty => tracing::trace!("{}: empty payload", topic),
        IgnoreReason::ValueMismatch => tracing::trace!("{}: payload does not match alias value", topic),
        IgnoreReason::NotUtf8 => tracing::debug!("{}: drop payload, not UTF-8", topic),
        IgnoreReason::InvalidName(name) => tracing::debug!("drop {}: regex test failed", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{AliasBinding, ExpectedValue};
    use crate::error::PlaybackError;
    use crate::messaging::TopicBus;
    use parking_lot::Mutex;
    use std::fs;
    use std::path::Path;

    #[derive(Default)]
    struct RecordingPlayer {
        played: Mutex<Vec<PathBuf>>,
    }

    impl Player for RecordingPlayer {
        fn play(&self, file: &Path) -> Result<(), PlaybackError> {
            self.played.lock().push(file.to_path_buf());
            Ok(())
        }
    }

    struct BrokenPlayer;

    impl Player for BrokenPlayer {
        fn play(&self, _file: &Path) -> Result<(), PlaybackError> {
            Err(PlaybackError::Spawn {
                command: "nope".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"),
            })
        }
    }

    fn message(topic: &str, payload: &[u8]) -> BusMessage {
        BusMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        }
    }

    fn sounds_dir() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("beep.mp3"), b"ID3").unwrap();
        fs::write(root.path().join("horn.wav"), b"RIFF").unwrap();
        root
    }

    fn handler(bus: &TopicBus, rule: TriggerRule, root: &Path, player: Arc<dyn Player>) -> TriggerHandler {
        let filter = match &rule {
            TriggerRule::SoundTopic => "sound/play".to_string(),
            TriggerRule::Alias(binding) => binding.topic.clone(),
        };
        TriggerHandler::new(bus.subscribe(&filter).unwrap(), rule, SoundResolver::new(root), player)
    }

    #[test]
    fn test_valid_sound_is_played() {
        let root = sounds_dir();
        let bus = TopicBus::new();
        let player = Arc::new(RecordingPlayer::default());
        let handler = handler(&bus, TriggerRule::SoundTopic, root.path(), player.clone());
        assert_eq!(handler.topic_filter(), "sound/play");

        let outcome = handler.handle_message(&message("sound/play", b"beep"));

        assert_eq!(outcome, HandleOutcome::Played(root.path().join("beep.mp3")));
        assert_eq!(*player.played.lock(), vec![root.path().join("beep.mp3")]);
    }

    #[test]
    fn test_invalid_payloads_never_resolve() {
        let root = sounds_dir();
        let bus = TopicBus::new();
        let player = Arc::new(RecordingPlayer::default());
        let handler = handler(&bus, TriggerRule::SoundTopic, root.path(), player.clone());

        for payload in [&b""[..], b"beep.mp3", b"../beep", b" beep"] {
            let outcome = handler.handle_message(&message("sound/play", payload));
            assert!(matches!(outcome, HandleOutcome::Ignored(_)), "{:?}", payload);
        }
        assert!(player.played.lock().is_empty());
    }

    #[test]
    fn test_missing_sound_skips_playback() {
        let root = sounds_dir();
        let bus = TopicBus::new();
        let player = Arc::new(RecordingPlayer::default());
        let handler = handler(&bus, TriggerRule::SoundTopic, root.path(), player.clone());

        let outcome = handler.handle_message(&message("sound/play", b"missing"));

        assert_eq!(outcome, HandleOutcome::NotFound(SoundName::trusted("missing")));
        assert!(player.played.lock().is_empty());
    }

    #[test]
    fn test_alias_plays_configured_sound_not_payload() {
        let root = sounds_dir();
        let bus = TopicBus::new();
        let player = Arc::new(RecordingPlayer::default());
        let rule = TriggerRule::Alias(AliasBinding {
            sound: SoundName::trusted("horn"),
            topic: "t/alias".to_string(),
            expected: ExpectedValue::Exactly("go".to_string()),
        });
        let handler = handler(&bus, rule, root.path(), player.clone());

        assert_eq!(
            handler.handle_message(&message("t/alias", b"go")),
            HandleOutcome::Played(root.path().join("horn.wav"))
        );
        assert_eq!(
            handler.handle_message(&message("t/alias", b"stop")),
            HandleOutcome::Ignored(IgnoreReason::ValueMismatch)
        );
        assert_eq!(player.played.lock().len(), 1);
    }

    #[test]
    fn test_playback_failure_is_contained() {
        let root = sounds_dir();
        let bus = TopicBus::new();
        let handler = handler(&bus, TriggerRule::SoundTopic, root.path(), Arc::new(BrokenPlayer));

        assert_eq!(handler.handle_message(&message("sound/play", b"beep")), HandleOutcome::Failed);
    }

    #[test]
    fn test_resolution_failure_is_contained() {
        let root = sounds_dir();
        fs::create_dir(root.path().join("empty")).unwrap();
        let bus = TopicBus::new();
        let player = Arc::new(RecordingPlayer::default());
        let handler = handler(&bus, TriggerRule::SoundTopic, root.path(), player.clone());

        assert_eq!(handler.handle_message(&message("sound/play", b"empty")), HandleOutcome::Failed);
        assert_eq!(
            handler.handle_message(&message("sound/play", b"beep")),
            HandleOutcome::Played(root.path().join("beep.mp3"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_sound_directory_is_contained() {
        use std::os::unix::fs::PermissionsExt;

        let root = sounds_dir();
        let locked = root.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("a.mp3"), b"ID3").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to root
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let bus = TopicBus::new();
        let player = Arc::new(RecordingPlayer::default());
        let handler = handler(&bus, TriggerRule::SoundTopic, root.path(), player.clone());

        assert_eq!(handler.handle_message(&message("sound/play", b"locked")), HandleOutcome::Failed);
        assert_eq!(
            handler.handle_message(&message("sound/play", b"beep")),
            HandleOutcome::Played(root.path().join("beep.mp3"))
        );
        assert_eq!(*player.played.lock(), vec![root.path().join("beep.mp3")]);

        // Let the temp dir clean itself up
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_run_processes_in_order_and_reports_closed_stream() {
        let root = sounds_dir();
        let bus = TopicBus::new();
        let player = Arc::new(RecordingPlayer::default());
        let handler = handler(&bus, TriggerRule::SoundTopic, root.path(), player.clone());

        bus.publish("sound/play", "horn");
        bus.publish("sound/play", "nothing");
        bus.publish("sound/play", "beep");
        bus.close("broker went away");

        match handler.run() {
            Err(DispatchError::SubscriptionClosed { filter, reason }) => {
                assert_eq!(filter, "sound/play");
                assert_eq!(reason, "broker went away");
            }
            other => panic!("Expected SubscriptionClosed, got {:?}", other),
        }

        assert_eq!(
            *player.played.lock(),
            vec![root.path().join("horn.wav"), root.path().join("beep.mp3")]
        );
    }
}
