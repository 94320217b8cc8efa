//! Bounded-size splitting of diff text.
//!
//! Chunking is character-oriented, not hunk-aware: boundaries may fall in the
//! middle of a line, which keeps the split lossless for any input.

use std::iter::FusedIterator;
use std::num::NonZeroUsize;

/// Default maximum chunk length, in characters.
pub const DEFAULT_MAX_CHARS: NonZeroUsize = match NonZeroUsize::new(5000) {
    Some(n) => n,
    None => panic!("default chunk size must be non-zero"),
};

/// Lazy iterator over the chunks of one diff text.
///
/// Cloning the iterator restarts from the clone point; [`chunk_diff`] can be
/// called again to restart from the beginning.
#[derive(Debug, Clone)]
pub struct DiffChunks<'a> {
    rest: &'a str,
    max_chars: usize,
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Concatenating the chunks in order reproduces `text` exactly. An empty
/// input yields no chunks.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
/// use revdigest_difflens::chunker::chunk_diff;
///
/// let max = NonZeroUsize::new(4).unwrap();
/// let chunks: Vec<&str> = chunk_diff("+abc\n-def\n", max).collect();
/// assert_eq!(chunks, vec!["+abc", "\n-de", "f\n"]);
/// assert_eq!(chunk_diff("", max).count(), 0);
/// ```
pub fn chunk_diff(text: &str, max_chars: NonZeroUsize) -> DiffChunks<'_> {
    DiffChunks {
        rest: text,
        max_chars: max_chars.get(),
    }
}

/// Number of chunks [`chunk_diff`] yields for `text`: `ceil(chars / max_chars)`.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
/// use revdigest_difflens::chunker::chunk_count;
///
/// let max = NonZeroUsize::new(5000).unwrap();
/// assert_eq!(chunk_count(&"x".repeat(12_000), max), 3);
/// assert_eq!(chunk_count("", max), 0);
/// ```
pub fn chunk_count(text: &str, max_chars: NonZeroUsize) -> usize {
    text.chars().count().div_ceil(max_chars.get())
}

impl<'a> Iterator for DiffChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .char_indices()
            .nth(self.max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rest.chars().count().div_ceil(self.max_chars);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DiffChunks<'_> {}

impl FusedIterator for DiffChunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn max(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn twelve_thousand_chars_make_three_chunks() {
        let text: String = (0..12_000)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let chunks: Vec<&str> = chunk_diff(&text, DEFAULT_MAX_CHARS).collect();
        let lengths: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lengths, vec![5000, 5000, 2000]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(chunk_diff("", max(1)).next().is_none());
        assert_eq!(chunk_diff("", DEFAULT_MAX_CHARS).len(), 0);
    }

    #[test]
    fn short_input_is_a_single_chunk() {
        let text = "@@ -1 +1 @@\n-a\n+b\n";
        let chunks: Vec<&str> = chunk_diff(text, DEFAULT_MAX_CHARS).collect();
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_chunk() {
        let chunks: Vec<&str> = chunk_diff("abcdef", max(3)).collect();
        assert_eq!(chunks, vec!["abc", "def"]);
    }

    #[test]
    fn multibyte_characters_count_once_and_never_split() {
        let text = "é€😀a\n-ß";
        let chunks: Vec<&str> = chunk_diff(text, max(2)).collect();
        assert_eq!(chunks, vec!["é€", "😀a", "\n-", "ß"]);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 2);
        }
    }

    #[test]
    fn chunks_partition_the_input_losslessly() {
        let samples = [
            "x",
            "diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -1,2 +1,2 @@\n-old\n+new\n ctx\n",
            "line without newline",
            "ünïcödé\r\nwindows\r\nline endings\r\n",
        ];
        for text in samples {
            for size in [1, 2, 3, 7, 64, 5000] {
                let chunks: Vec<&str> = chunk_diff(text, max(size)).collect();
                assert_eq!(chunks.concat(), text, "size {size}");
                assert!(chunks.iter().all(|c| c.chars().count() <= size));
                assert!(chunks.iter().all(|c| !c.is_empty()));
                assert_eq!(chunks.len(), chunk_count(text, max(size)));
            }
        }
    }

    #[test]
    fn iterator_is_restartable_and_exact_size() {
        let chunks = chunk_diff("abcdefg", max(2));
        assert_eq!(chunks.len(), 4);

        let mut first = chunks.clone();
        assert_eq!(first.next(), Some("ab"));
        assert_eq!(first.len(), 3);

        let replay: Vec<&str> = chunks.collect();
        assert_eq!(replay, vec!["ab", "cd", "ef", "g"]);
    }

    #[test]
    fn exhausted_iterator_stays_exhausted() {
        let mut chunks = chunk_diff("ab", max(5));
        assert_eq!(chunks.next(), Some("ab"));
        assert_eq!(chunks.next(), None);
        assert_eq!(chunks.next(), None);
    }
}
