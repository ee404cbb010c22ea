/// Single-slot suppressor for immediate repeats.
///
/// Overlapping windows frequently re-transcribe the same trailing speech;
/// comparing against just the most recent emission removes the common
/// exact-repeat case. This is deliberately not a history-based dedup, so a
/// text that alternates with another is emitted every time it reappears.
#[derive(Debug, Default)]
pub struct RepeatFilter {
    last_emitted: String,
}

impl RepeatFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `text` (already trimmed) for emission when it is non-empty and
    /// differs from the previous accepted text. Updates the slot on accept.
    pub fn accept(&mut self, text: &str) -> bool {
        if text.is_empty() || text == self.last_emitted {
            return false;
        }
        self.last_emitted.clear();
        self.last_emitted.push_str(text);
        true
    }

    pub fn last_emitted(&self) -> &str {
        &self.last_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_text() {
        let mut filter = RepeatFilter::new();
        assert!(!filter.accept(""));
    }

    #[test]
    fn suppresses_consecutive_repeats() {
        let mut filter = RepeatFilter::new();
        assert!(filter.accept("hello world"));
        assert!(!filter.accept("hello world"));
        assert!(!filter.accept("hello world"));
        assert_eq!(filter.last_emitted(), "hello world");
    }

    #[test]
    fn accepts_alternating_texts_every_time() {
        let mut filter = RepeatFilter::new();
        assert!(filter.accept("one"));
        assert!(filter.accept("two"));
        assert!(filter.accept("one"));
    }
}
