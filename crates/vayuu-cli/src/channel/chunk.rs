//! Message chunking for Telegram.
//!
//! Telegram rejects text messages over 4096 characters, so long replies are
//! split before sending.

/// Split threshold, below the Telegram hard limit.
pub const DEFAULT_CHUNK_CHARS: usize = 4000;

/// Split `text` into pieces of at most `max_chars` characters.
///
/// A split prefers the last paragraph break (`\n\n`) inside the window, then
/// the last line break, then a hard cut at a character boundary.
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    let limit = max_chars.max(1);
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.chars().count() > limit {
        let window_end = remaining
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..window_end];

        let (split_at, skip) = match window.rfind("\n\n") {
            Some(pos) if pos > 0 => (pos, 2),
            _ => match window.rfind('\n') {
                Some(pos) if pos > 0 => (pos, 1),
                _ => (window_end, 0),
            },
        };

        let piece = remaining[..split_at].trim_end();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        remaining = remaining[split_at + skip..].trim_start_matches('\n');
    }

    let tail = remaining.trim_end();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(chunk_message("hello", 10), vec!["hello"]);
        assert!(chunk_message("  \n ", 10).is_empty());
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let text = "first line\nsecond\n\nthird paragraph";
        let chunks = chunk_message(text, 20);
        assert_eq!(chunks, vec!["first line\nsecond", "third paragraph"]);
    }

    #[test]
    fn test_falls_back_to_line_break() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(chunk_message(text, 11), vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_hard_cut_is_char_safe() {
        let text = "é".repeat(25);
        let chunks = chunk_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_every_chunk_within_limit() {
        let text = (0..500)
            .map(|i| format!("line number {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk_message(&text, DEFAULT_CHUNK_CHARS);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= DEFAULT_CHUNK_CHARS));
        assert!(chunks[0].starts_with("line number 0\n"));
        assert!(chunks.last().unwrap().ends_with("line number 499"));
    }
}
