/// MQTT topic filter matching
///
/// `+` matches exactly one level, `#` matches the remaining levels (including
/// none) and must be last. Wildcards at the first level never match topics
/// starting with `$`.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Check that a filter is well formed before subscribing with it
pub fn is_valid_filter(filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }

    let levels: Vec<&str> = filter.split('/').collect();
    let last = levels.len() - 1;
    levels.iter().enumerate().all(|(i, level)| match *level {
        "#" => i == last,
        "+" => true,
        other => !other.contains('#') && !other.contains('+'),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(topic_matches("sound/play", "sound/play"));
        assert!(!topic_matches("sound/play", "sound/play/x"));
        assert!(!topic_matches("sound/play", "sound"));
    }

    #[test]
    fn test_single_level_wildcard() {
        assert!(topic_matches("home/+/bell", "home/front/bell"));
        assert!(!topic_matches("home/+/bell", "home/front/back/bell"));
        assert!(topic_matches("home/+", "home/"));
    }

    #[test]
    fn test_multi_level_wildcard() {
        assert!(topic_matches("home/#", "home"));
        assert!(topic_matches("home/#", "home/front/bell"));
        assert!(topic_matches("#", "anything/at/all"));
        assert!(!topic_matches("home/#", "garage/door"));
    }

    #[test]
    fn test_system_topics_hidden_from_wildcards() {
        assert!(!topic_matches("#", "$SYS/uptime"));
        assert!(!topic_matches("+/uptime", "$SYS/uptime"));
        assert!(topic_matches("$SYS/#", "$SYS/uptime"));
    }

    #[test]
    fn test_filter_validation() {
        assert!(is_valid_filter("sound/play"));
        assert!(is_valid_filter("home/+/bell"));
        assert!(is_valid_filter("home/#"));
        assert!(!is_valid_filter(""));
        assert!(!is_valid_filter("home/#/bell"));
        assert!(!is_valid_filter("home/fr+nt"));
    }
}
