//! Single-slot context storage with write-time truncation.

/// Cut `text` to at most `max_chars` characters.
///
/// Hard cut at the boundary with no word awareness. Counting characters
/// rather than bytes keeps the cut on a UTF-8 boundary. Idempotent.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Holds the current context. Empty until the first successful load.
#[derive(Debug, Clone)]
pub struct ContextStore {
    text: String,
    max_chars: usize,
}

impl ContextStore {
    pub fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            max_chars,
        }
    }

    /// Replace the stored context, truncating to the configured maximum.
    pub fn set(&mut self, text: &str) {
        self.text = truncate_chars(text, self.max_chars).to_string();
    }

    pub fn get(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Stored length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_cuts_at_raw_length() {
        assert_eq!(truncate_chars("hello world", 7), "hello w");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exact", 5), "exact");
    }

    #[test]
    fn truncate_is_idempotent() {
        let once = truncate_chars("abcdefghij", 4);
        assert_eq!(truncate_chars(once, 4), once);
    }

    #[test]
    fn truncate_respects_multibyte_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn store_starts_empty() {
        let store = ContextStore::new(10);
        assert!(store.is_empty());
        assert_eq!(store.get(), "");
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn set_overwrites_and_truncates() {
        let mut store = ContextStore::new(5);
        store.set("first page text");
        assert_eq!(store.get(), "first");

        store.set("2nd");
        assert_eq!(store.get(), "2nd");
        assert!(store.len() <= store.max_chars());
    }
}
