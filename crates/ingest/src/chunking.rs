//! Chunking strategies
//!
//! Auto-selection by content shape: FAQ pairs beat section structure beat
//! list items beat code-heavy text beat plain paragraphs. Section-derived
//! chunks carry a compact `[section > subsection]` prefix capped at 32
//! tokens; FAQ and item chunks keep their text untouched.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::IngestError;
use vaani_config::constants::chunking as chunk_constants;
use vaani_text::{ContentDensity, RecursiveSplitter, SplitterConfig, Tokenizer};

static FAQ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*Q:").expect("faq regex"));
static ANSWER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*A:").expect("answer regex"));
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,3}\s").expect("header regex"));
static LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:[-*•]|\d+\.)\s").expect("list regex"));

/// Chunking strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    Faq,
    Section,
    Item,
    Paragraph,
    Sentence,
    Fixed,
}

/// A chunk ready for embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub chunk_index: usize,
    pub token_count: usize,
    pub char_count: usize,
    pub strategy: ChunkStrategy,
    /// Heading path this chunk came from, outermost first
    pub section_path: Vec<String>,
}

/// Strategy selection and chunk production
pub struct ChunkingService {
    tokenizer: Arc<Tokenizer>,
}

impl ChunkingService {
    pub fn new(tokenizer: Arc<Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Pick a strategy from the text shape
    pub fn detect_strategy(&self, text: &str) -> ChunkStrategy {
        if FAQ_RE.is_match(text) && ANSWER_RE.is_match(text) {
            return ChunkStrategy::Faq;
        }
        if HEADER_RE.find_iter(text).count() >= 3 {
            return ChunkStrategy::Section;
        }
        if LIST_RE.find_iter(text).count() >= 5 {
            return ChunkStrategy::Item;
        }
        if text.contains("```") {
            return ChunkStrategy::Sentence;
        }
        ChunkStrategy::Paragraph
    }

    /// Chunk with auto-selected strategy
    pub fn auto_chunk_text(
        &self,
        text: &str,
    ) -> Result<(ChunkStrategy, Vec<TextChunk>), IngestError> {
        let strategy = self.detect_strategy(text);
        let chunks = self.chunk_text(text, strategy)?;
        Ok((strategy, chunks))
    }

    /// Chunk with an explicit strategy
    pub fn chunk_text(
        &self,
        text: &str,
        strategy: ChunkStrategy,
    ) -> Result<Vec<TextChunk>, IngestError> {
        let chunks = match strategy {
            ChunkStrategy::Faq => {
                let faq = self.chunk_faq(text);
                if faq.is_empty() {
                    // No extractable pairs after all: paragraph fallback.
                    return self.chunk_text(text, ChunkStrategy::Paragraph);
                }
                faq
            }
            ChunkStrategy::Section => self.chunk_sections(text),
            ChunkStrategy::Item => self.chunk_items(text),
            ChunkStrategy::Sentence => {
                self.split_with(text, SplitterConfig::high_density(), ChunkStrategy::Sentence)
            }
            ChunkStrategy::Paragraph => {
                let density = ContentDensity::detect(text);
                self.split_with(text, SplitterConfig::for_density(density), ChunkStrategy::Paragraph)
            }
            ChunkStrategy::Fixed => self.chunk_fixed(text),
        };

        Ok(self.finalize(chunks))
    }

    /// One chunk per Q/A pair
    fn chunk_faq(&self, text: &str) -> Vec<TextChunk> {
        let starts: Vec<usize> = FAQ_RE.find_iter(text).map(|m| m.start()).collect();
        if starts.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            let pair = text[start..end].trim();
            if pair.is_empty() || !ANSWER_RE.is_match(pair) {
                continue;
            }
            chunks.push(self.bare_chunk(pair.to_string(), ChunkStrategy::Faq, Vec::new()));
        }
        chunks
    }

    /// Split at H1..H3 headers; each section keeps its heading path prefix
    fn chunk_sections(&self, text: &str) -> Vec<TextChunk> {
        let mut sections: Vec<(Vec<String>, String)> = Vec::new();
        let mut path: Vec<(u8, String)> = Vec::new();
        let mut body = String::new();

        let flush = |path: &[(u8, String)], body: &mut String, sections: &mut Vec<(Vec<String>, String)>| {
            let text = body.trim().to_string();
            body.clear();
            if !text.is_empty() {
                sections.push((path.iter().map(|(_, t)| t.clone()).collect(), text));
            }
        };

        for line in text.lines() {
            let trimmed = line.trim();
            let hashes = trimmed.chars().take_while(|&c| c == '#').count();
            if (1..=3).contains(&hashes) && trimmed.chars().nth(hashes) == Some(' ') {
                flush(&path, &mut body, &mut sections);
                let level = hashes as u8;
                path.retain(|(l, _)| *l < level);
                path.push((level, trimmed.trim_start_matches('#').trim().to_string()));
            } else {
                body.push_str(line);
                body.push('\n');
            }
        }
        flush(&path, &mut body, &mut sections);

        let splitter_config = SplitterConfig::standard();
        let mut chunks = Vec::new();
        for (section_path, section_body) in sections {
            let prefix = self.context_prefix(&section_path);
            for piece in
                RecursiveSplitter::new(self.tokenizer.clone(), splitter_config).split(&section_body)
            {
                let text = if prefix.is_empty() {
                    piece.text
                } else {
                    format!("{} {}", prefix, piece.text)
                };
                chunks.push(self.bare_chunk(text, ChunkStrategy::Section, section_path.clone()));
            }
        }
        chunks
    }

    /// Accumulate small adjacent list items into one chunk
    fn chunk_items(&self, text: &str) -> Vec<TextChunk> {
        let config = SplitterConfig::standard();
        let mut chunks = Vec::new();
        let mut buffer = String::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            buffer.push_str(trimmed);
            buffer.push('\n');

            if self.tokenizer.count_tokens(&buffer) >= config.min_tokens {
                chunks.push(self.bare_chunk(
                    buffer.trim().to_string(),
                    ChunkStrategy::Item,
                    Vec::new(),
                ));
                buffer.clear();
            }
        }

        let tail = buffer.trim();
        if !tail.is_empty() {
            if let Some(last) = chunks.last_mut() {
                let merged = format!("{}\n{}", last.text, tail);
                if self.tokenizer.count_tokens(&merged) <= config.max_tokens {
                    last.text = merged;
                } else {
                    let tail = tail.to_string();
                    chunks.push(self.bare_chunk(tail, ChunkStrategy::Item, Vec::new()));
                }
            } else {
                chunks.push(self.bare_chunk(tail.to_string(), ChunkStrategy::Item, Vec::new()));
            }
        }
        chunks
    }

    /// Fixed token windows, no overlap
    fn chunk_fixed(&self, text: &str) -> Vec<TextChunk> {
        let config = SplitterConfig::standard();
        let mut chunks = Vec::new();
        let mut rest = text.trim();

        while !rest.is_empty() {
            let (head, tail) = self
                .tokenizer
                .split_at_token_boundary(rest, config.target_tokens);
            if head.is_empty() {
                break;
            }
            chunks.push(self.bare_chunk(
                head.trim().to_string(),
                ChunkStrategy::Fixed,
                Vec::new(),
            ));
            rest = tail.trim_start();
        }
        chunks
    }

    fn split_with(
        &self,
        text: &str,
        config: SplitterConfig,
        strategy: ChunkStrategy,
    ) -> Vec<TextChunk> {
        RecursiveSplitter::new(self.tokenizer.clone(), config)
            .split(text)
            .into_iter()
            .map(|piece| self.bare_chunk(piece.text, strategy, Vec::new()))
            .collect()
    }

    /// `[section > subsection]` capped at the prefix token budget
    fn context_prefix(&self, section_path: &[String]) -> String {
        if section_path.is_empty() {
            return String::new();
        }
        let prefix = format!("[{}]", section_path.join(" > "));
        let (head, rest) = self
            .tokenizer
            .split_at_token_boundary(&prefix, chunk_constants::CONTEXT_PREFIX_MAX_TOKENS);
        if rest.is_empty() {
            prefix
        } else {
            format!("{}]", head.trim_end_matches(']'))
        }
    }

    fn bare_chunk(
        &self,
        text: String,
        strategy: ChunkStrategy,
        section_path: Vec<String>,
    ) -> TextChunk {
        let token_count = self.tokenizer.count_tokens(&text);
        TextChunk {
            char_count: text.chars().count(),
            token_count,
            text,
            chunk_index: 0,
            strategy,
            section_path,
        }
    }

    fn finalize(&self, mut chunks: Vec<TextChunk>) -> Vec<TextChunk> {
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.chunk_index = i;
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ChunkingService {
        ChunkingService::new(Arc::new(
            Tokenizer::with_cache_capacity(4096).expect("cl100k table"),
        ))
    }

    #[test]
    fn test_faq_detection_and_pairs() {
        let service = service();
        let text = "Q: What time?\nA: 9 AM\n\nQ: Where?\nA: Main Street";

        let (strategy, chunks) = service.auto_chunk_text(text).unwrap();
        assert_eq!(strategy, ChunkStrategy::Faq);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("Q: What time?\nA: 9 AM"));
        assert!(chunks[1].text.starts_with("Q: Where?\nA: Main Street"));
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_faq_without_answers_falls_back() {
        let service = service();
        let text = "Q: Lonely question with no answer\n\nSome other paragraph of text.";
        let chunks = service.chunk_text(text, ChunkStrategy::Faq).unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.strategy == ChunkStrategy::Paragraph));
    }

    #[test]
    fn test_section_strategy_detection() {
        let service = service();
        let text = "# One\n\nBody one.\n\n## Two\n\nBody two.\n\n## Three\n\nBody three.";
        assert_eq!(service.detect_strategy(text), ChunkStrategy::Section);

        let (_, chunks) = service.auto_chunk_text(text).unwrap();
        assert!(chunks.len() >= 3);
        // Nested section carries its heading path prefix.
        let nested = chunks.iter().find(|c| c.text.contains("Body two")).unwrap();
        assert!(nested.text.starts_with("[One > Two]"), "got {:?}", nested.text);
        assert_eq!(nested.section_path, vec!["One".to_string(), "Two".to_string()]);
    }

    #[test]
    fn test_item_strategy() {
        let service = service();
        let text = "- alpha item\n- beta item\n- gamma item\n- delta item\n- epsilon item\n- zeta item";
        assert_eq!(service.detect_strategy(text), ChunkStrategy::Item);

        let chunks = service.chunk_text(text, ChunkStrategy::Item).unwrap();
        assert!(!chunks.is_empty());
        // All items survive somewhere.
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n");
        for item in ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"] {
            assert!(joined.contains(item));
        }
    }

    #[test]
    fn test_code_triggers_sentence() {
        let service = service();
        let text = "Here is code:\n\n```python\nprint('hi')\n```\n\nAnd some text after.";
        assert_eq!(service.detect_strategy(text), ChunkStrategy::Sentence);
    }

    #[test]
    fn test_default_paragraph() {
        let service = service();
        let text = "Just an ordinary paragraph of prose without structure.";
        assert_eq!(service.detect_strategy(text), ChunkStrategy::Paragraph);
    }

    #[test]
    fn test_fixed_windows_cover_text() {
        let service = service();
        let text = "word ".repeat(2000);
        let chunks = service.chunk_text(&text, ChunkStrategy::Fixed).unwrap();
        assert!(chunks.len() > 1);
        let total: usize = chunks.iter().map(|c| c.token_count).sum();
        assert!(total >= service.tokenizer.count_tokens(text.trim()) - chunks.len());
    }

    #[test]
    fn test_context_prefix_budget() {
        let service = service();
        let long_path: Vec<String> = (0..20).map(|i| format!("Deeply Nested Section {}", i)).collect();
        let prefix = service.context_prefix(&long_path);
        assert!(
            service.tokenizer.count_tokens(&prefix)
                <= chunk_constants::CONTEXT_PREFIX_MAX_TOKENS + 1
        );
    }

    #[test]
    fn test_chunk_metadata() {
        let service = service();
        let (_, chunks) = service
            .auto_chunk_text("A plain paragraph that will become one chunk.")
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].token_count > 0);
        assert_eq!(chunks[0].char_count, chunks[0].text.chars().count());
    }
}
