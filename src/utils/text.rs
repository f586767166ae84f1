//! Text processing utilities.

/// Maximum number of characters kept in a vector's display name.
pub const DISPLAY_NAME_CHARS: usize = 25;

/// Check if content has something worth embedding (not just whitespace).
pub fn has_meaningful_content(content: &str) -> bool {
    content.chars().any(|c| !c.is_whitespace())
}

/// Leading characters of `text` used as a human-readable label.
pub fn display_name(text: &str) -> String {
    text.chars().take(DISPLAY_NAME_CHARS).collect()
}

/// Resolve a configured secret. Values of the form `$NAME` are read from the
/// environment; anything else is returned as-is.
pub fn resolve_secret(value: &str) -> String {
    match value.strip_prefix('$') {
        Some(var) if !var.is_empty() => std::env::var(var).unwrap_or_default(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_meaningful_content() {
        assert!(!has_meaningful_content(""));
        assert!(!has_meaningful_content("   \n\n   "));
        assert!(has_meaningful_content("a"));
    }

    #[test]
    fn test_display_name_respects_char_boundaries() {
        assert_eq!(display_name("short"), "short");
        assert_eq!(display_name(&"x".repeat(40)).len(), 25);
        let cjk = "知识库".repeat(20);
        assert_eq!(display_name(&cjk).chars().count(), 25);
    }

    #[test]
    fn test_resolve_secret_literal() {
        assert_eq!(resolve_secret("sk-abc"), "sk-abc");
        assert_eq!(resolve_secret("$"), "$");
        assert_eq!(resolve_secret("$RAGCHAT_SURELY_UNSET_VAR"), "");
    }
}
