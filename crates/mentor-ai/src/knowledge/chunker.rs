//! Sentence-bounded text chunking

use unicode_segmentation::UnicodeSegmentation;

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters carried into the next chunk
    overlap: usize,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    /// Split text into overlapping chunks that end on sentence boundaries where possible
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0;
        // Whether `current` holds text beyond the carried overlap
        let mut has_new = false;

        for sentence in text.split_sentence_bounds() {
            for segment in self.split_oversized(sentence) {
                let segment_chars = char_len(&segment);
                if !current.trim().is_empty() && current_chars + segment_chars > self.chunk_size {
                    chunks.push(current.trim().to_string());
                    current = self.overlap_text(&current);
                    has_new = false;
                    current_chars = char_len(&current);
                    // Overlap yields to the size limit
                    if current_chars + segment_chars > self.chunk_size {
                        current.clear();
                        current_chars = 0;
                    }
                }
                current.push_str(&segment);
                current_chars += segment_chars;
                has_new |= !segment.trim().is_empty();
            }
        }

        if has_new && !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }

        chunks
    }

    /// Break a segment longer than the chunk size on word bounds, then on characters
    fn split_oversized(&self, segment: &str) -> Vec<String> {
        if char_len(segment) <= self.chunk_size {
            return vec![segment.to_string()];
        }

        let mut pieces = Vec::new();
        let mut piece = String::new();
        let mut piece_chars = 0;

        for word in segment.split_word_bounds() {
            let word_chars = char_len(word);
            if word_chars > self.chunk_size {
                if !piece.is_empty() {
                    pieces.push(std::mem::take(&mut piece));
                    piece_chars = 0;
                }
                let chars: Vec<char> = word.chars().collect();
                for part in chars.chunks(self.chunk_size) {
                    pieces.push(part.iter().collect());
                }
                continue;
            }
            if piece_chars + word_chars > self.chunk_size {
                pieces.push(std::mem::take(&mut piece));
                piece_chars = 0;
            }
            piece.push_str(word);
            piece_chars += word_chars;
        }
        if !piece.is_empty() {
            pieces.push(piece);
        }

        pieces
    }

    /// Tail of a chunk, starting at a sentence or word boundary
    fn overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        let total = char_len(text);
        if total <= self.overlap {
            return text.to_string();
        }

        let start = text
            .char_indices()
            .nth(total - self.overlap)
            .map_or(text.len(), |(i, _)| i);
        let tail = &text[start..];

        if let Some(pos) = tail.find(". ") {
            return tail[pos + 2..].to_string();
        }
        if let Some(pos) = tail.find(' ') {
            return tail[pos + 1..].to_string();
        }
        tail.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::new(1000, 200);
        let chunks = chunker.chunk("Die Bewerbung läuft online. Fristen beachten!");
        assert_eq!(chunks, vec!["Die Bewerbung läuft online. Fristen beachten!"]);
    }

    #[test]
    fn test_long_text_is_split_with_overlap() {
        let chunker = TextChunker::new(120, 40);
        let text = (1..=12)
            .map(|i| format!("Satz Nummer {} beschreibt etwas.", i))
            .collect::<Vec<_>>()
            .join(" ");

        let chunks = chunker.chunk(&text);
        assert!(chunks.len() > 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120, "chunk too long: {}", chunk.len());
        }
        assert!(chunks[0].starts_with("Satz Nummer 1 "));
        assert!(chunks.last().unwrap().ends_with("Satz Nummer 12 beschreibt etwas."));

        // The start of each chunk repeats text from the end of the previous one
        let first_sentence = chunks[1].split('.').next().unwrap();
        assert!(chunks[0].contains(first_sentence));
    }

    #[test]
    fn test_size_counts_characters() {
        // 39 characters but 43 bytes per sentence
        let sentence = "Die Prüfung für Übungen läuft früh ab. ";
        let text = sentence.repeat(5);

        let chunks = TextChunker::new(120, 0).chunk(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].matches("Prüfung").count(), 3);
        assert_eq!(chunks[1].matches("Prüfung").count(), 2);
    }

    #[test]
    fn test_text_without_sentence_ends_is_bounded() {
        let chunks = TextChunker::new(1000, 200).chunk(&"wort ".repeat(1000));
        assert!(chunks.len() >= 5);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000, "chunk too long: {}", chunk.len());
            assert!(chunk.starts_with("wort"));
        }
    }

    #[test]
    fn test_single_long_word_is_hard_split() {
        let chunks = TextChunker::new(1000, 0).chunk(&"ä".repeat(2500));
        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![1000, 1000, 500]);
    }

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::new(100, 10);
        assert!(chunker.chunk("   ").is_empty());
    }
}
