//! Topic-filter matching.
//!
//! Implements MQTT 3.1.1 filter semantics for handler dispatch: `+` matches
//! exactly one topic level, `#` matches the remaining levels (including the
//! parent level) and is only meaningful as the final token. A filter with a
//! misplaced `#` never matches.

/// Whether `filter` matches `topic`.
pub fn matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(level)) if expected == level => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Whether `filter` is a valid subscription filter: non-empty, and `#`
/// appears at most once, alone, in the final level.
pub fn valid_filter(filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }
    let levels = filter.split('/').count();
    for (i, level) in filter.split('/').enumerate() {
        let last = i + 1 == levels;
        if level.contains('#') && (level != "#" || !last) {
            return false;
        }
        if level.contains('+') && level != "+" {
            return false;
        }
    }
    true
}

/// Whether `topic` is a valid publish topic: non-empty and wildcard-free.
pub fn valid_topic(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains('+') && !topic.contains('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(matches("a/b/c", "a/b/c"));
        assert!(!matches("a/b/c", "a/b"));
        assert!(!matches("a/b", "a/b/c"));
        assert!(!matches("a/b/c", "a/b/d"));
    }

    #[test]
    fn single_level_wildcard() {
        assert!(matches("a/+/c", "a/b/c"));
        assert!(matches("a/+/c", "a/x/c"));
        assert!(!matches("a/+/c", "a/b/x/c"));
        assert!(!matches("a/+", "a"));
        // An empty level is still one level.
        assert!(matches("a/+", "a/"));
    }

    #[test]
    fn multi_level_wildcard() {
        assert!(matches("#", "anything/at/all"));
        assert!(matches("a/#", "a/b/c"));
        assert!(matches("a/#", "a"));
        assert!(!matches("a/#", "b/a"));
        // '#' must be the final token.
        assert!(!matches("a/#/c", "a/b/c"));
    }

    #[test]
    fn filter_validity() {
        assert!(valid_filter("a/b/c"));
        assert!(valid_filter("a/+/c"));
        assert!(valid_filter("a/#"));
        assert!(valid_filter("#"));
        assert!(!valid_filter(""));
        assert!(!valid_filter("a/#/c"));
        assert!(!valid_filter("a/b#"));
        assert!(!valid_filter("a/b+/c"));
    }

    #[test]
    fn topic_validity() {
        assert!(valid_topic("a/b/c"));
        assert!(!valid_topic(""));
        assert!(!valid_topic("a/+/c"));
        assert!(!valid_topic("a/#"));
    }
}
