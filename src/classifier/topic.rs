// src/classifier/topic.rs
// extractTopic(content) — collapse whitespace, trim, cap at 100 chars.

const MAX_TOPIC_LEN: usize = 100;
const TRUNCATE_LEN: usize = 97;

pub fn extract_topic(content: &str) -> String {
    let collapsed: String = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = collapsed.trim();

    if collapsed.chars().count() <= MAX_TOPIC_LEN {
        return collapsed.to_string();
    }

    let truncated: String = collapsed.chars().take(TRUNCATE_LEN).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(extract_topic("  hello   world  \n\n"), "hello world");
    }

    #[test]
    fn leaves_short_content_untouched() {
        assert_eq!(extract_topic("book a hotel"), "book a hotel");
    }

    #[test]
    fn truncates_long_content_with_ellipsis() {
        let long = "x".repeat(150);
        let topic = extract_topic(&long);
        assert_eq!(topic.chars().count(), TRUNCATE_LEN + 1);
        assert!(topic.ends_with('…'));
    }

    #[test]
    fn boundary_at_exactly_max_len_is_untouched() {
        let exact = "x".repeat(MAX_TOPIC_LEN);
        assert_eq!(extract_topic(&exact), exact);
    }
}
