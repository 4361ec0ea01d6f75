//! Recursive token-bounded splitting
//!
//! Splits text into chunks whose token counts stay inside
//! `[min_tokens, max_tokens]`, aiming for `target_tokens`. Fenced code
//! blocks, pipe tables, and Q/A pairs are detected up front and kept whole.
//! Each chunk after the first is prefixed with an overlap drawn from the end
//! of its predecessor, aligned to a sentence or line boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::tokenizer::Tokenizer;
use vaani_config::constants::chunking;

/// Chunk size presets keyed by content density
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentDensity {
    /// Dense technical prose: smaller chunks
    High,
    #[default]
    Standard,
    /// Light conversational prose: larger chunks
    Low,
}

impl ContentDensity {
    /// Detect density from technical-term ratio, mean sentence length, and
    /// header density.
    pub fn detect(text: &str) -> Self {
        let words: Vec<&str> = text.unicode_words().collect();
        if words.is_empty() {
            return ContentDensity::Standard;
        }

        let technical = words.iter().filter(|w| is_technical_term(w)).count();
        let tech_ratio = technical as f32 / words.len() as f32;

        let sentences = sentence_units(text);
        let mean_sentence_len = if sentences.is_empty() {
            words.len() as f32
        } else {
            words.len() as f32 / sentences.len() as f32
        };

        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let headers = lines
            .iter()
            .filter(|l| l.trim_start().starts_with('#'))
            .count();
        let header_density = if lines.is_empty() {
            0.0
        } else {
            headers as f32 / lines.len() as f32
        };

        let score = tech_ratio * 3.0 + mean_sentence_len / 30.0 + header_density;

        if score >= 0.9 {
            ContentDensity::High
        } else if score <= 0.3 {
            ContentDensity::Low
        } else {
            ContentDensity::Standard
        }
    }
}

fn is_technical_term(word: &str) -> bool {
    let has_digit = word.chars().any(|c| c.is_ascii_digit());
    let has_underscore = word.contains('_');
    let camel = word
        .as_bytes()
        .windows(2)
        .any(|w| w[0].is_ascii_lowercase() && w[1].is_ascii_uppercase());
    let all_caps = word.len() >= 2 && word.chars().all(|c| c.is_ascii_uppercase());
    has_digit || has_underscore || camel || all_caps
}

/// Splitting bounds in tokens
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitterConfig {
    pub target_tokens: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SplitterConfig {
    pub fn standard() -> Self {
        Self {
            target_tokens: chunking::STANDARD_TARGET_TOKENS,
            min_tokens: chunking::STANDARD_MIN_TOKENS,
            max_tokens: chunking::STANDARD_MAX_TOKENS,
            overlap_tokens: chunking::STANDARD_OVERLAP_TOKENS,
        }
    }

    pub fn high_density() -> Self {
        Self {
            target_tokens: 256,
            min_tokens: 128,
            max_tokens: 384,
            overlap_tokens: 48,
        }
    }

    pub fn low_density() -> Self {
        Self {
            target_tokens: 512,
            min_tokens: 256,
            max_tokens: 640,
            overlap_tokens: 80,
        }
    }

    pub fn for_density(density: ContentDensity) -> Self {
        match density {
            ContentDensity::High => Self::high_density(),
            ContentDensity::Standard => Self::standard(),
            ContentDensity::Low => Self::low_density(),
        }
    }
}

/// A chunk produced by the splitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitChunk {
    pub text: String,
    pub token_count: usize,
}

#[derive(Debug, Clone)]
struct Segment {
    text: String,
    token_count: usize,
    /// Protected regions must not be merged or re-split
    atomic: bool,
}

/// Separator hierarchy, strongest first. Character-level token splitting is
/// the implicit last resort.
#[derive(Debug, Clone, Copy)]
enum Separator {
    Literal(&'static str),
    HorizontalRule,
}

const SEPARATORS: &[Separator] = &[
    Separator::Literal("\n\n\n"),
    Separator::HorizontalRule,
    Separator::Literal("\n\n"),
    Separator::Literal("\n"),
    Separator::Literal(". "),
    Separator::Literal("? "),
    Separator::Literal("! "),
    Separator::Literal("; "),
    Separator::Literal(", "),
    Separator::Literal(" "),
];

/// Recursive token-bounded splitter
pub struct RecursiveSplitter {
    tokenizer: Arc<Tokenizer>,
    config: SplitterConfig,
}

impl RecursiveSplitter {
    pub fn new(tokenizer: Arc<Tokenizer>, config: SplitterConfig) -> Self {
        Self { tokenizer, config }
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split with the preset matching the detected content density
    pub fn split_auto(tokenizer: Arc<Tokenizer>, text: &str) -> Vec<SplitChunk> {
        let density = ContentDensity::detect(text);
        Self::new(tokenizer, SplitterConfig::for_density(density)).split(text)
    }

    /// Split text into token-bounded chunks
    pub fn split(&self, text: &str) -> Vec<SplitChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut segments = Vec::new();
        for (region, protected) in protected_regions(text) {
            if protected {
                let token_count = self.tokenizer.count_tokens(region.trim());
                if token_count > self.config.max_tokens * 2 {
                    tracing::warn!(
                        tokens = token_count,
                        limit = self.config.max_tokens * 2,
                        "oversized protected region kept whole"
                    );
                }
                segments.push(Segment {
                    text: region.trim().to_string(),
                    token_count,
                    atomic: true,
                });
            } else {
                self.collect_segments(&region, &mut segments);
            }
        }

        let mut chunks = self.pack(segments);
        self.apply_overlap(&mut chunks);
        chunks.into_iter().map(|(chunk, _)| chunk).collect()
    }

    /// Recursively break a plain-text run into segments of at most
    /// `max_tokens` each.
    fn collect_segments(&self, text: &str, out: &mut Vec<Segment>) {
        if text.trim().is_empty() {
            return;
        }

        let token_count = self.tokenizer.count_tokens(text);
        if token_count <= self.config.max_tokens {
            out.push(Segment {
                text: text.to_string(),
                token_count,
                atomic: false,
            });
            return;
        }

        for separator in SEPARATORS {
            let parts = split_inclusive_on(text, *separator);
            if parts.len() >= 2 {
                for part in parts {
                    self.collect_segments(&part, out);
                }
                return;
            }
        }

        // No separator applies: cut at token boundaries.
        let mut rest = text;
        while self.tokenizer.count_tokens(rest) > self.config.max_tokens {
            let (head, tail) = self
                .tokenizer
                .split_at_token_boundary(rest, self.config.target_tokens);
            if head.is_empty() {
                break;
            }
            out.push(Segment {
                text: head.to_string(),
                token_count: self.tokenizer.count_tokens(head),
                atomic: false,
            });
            rest = tail;
        }
        if !rest.trim().is_empty() {
            out.push(Segment {
                text: rest.to_string(),
                token_count: self.tokenizer.count_tokens(rest),
                atomic: false,
            });
        }
    }

    /// Greedily accumulate segments up to the target, flushing on overflow.
    fn pack(&self, segments: Vec<Segment>) -> Vec<(SplitChunk, bool)> {
        let mut chunks: Vec<(SplitChunk, bool)> = Vec::new();
        let mut buffer = String::new();

        for segment in segments {
            if segment.atomic {
                self.flush(&mut buffer, &mut chunks);
                chunks.push((
                    SplitChunk {
                        text: segment.text,
                        token_count: segment.token_count,
                    },
                    true,
                ));
                continue;
            }

            if !buffer.is_empty() {
                let buffered = self.tokenizer.count_tokens(buffer.trim());
                if buffered + segment.token_count > self.config.target_tokens {
                    self.flush(&mut buffer, &mut chunks);
                }
            }
            buffer.push_str(&segment.text);
        }

        self.flush(&mut buffer, &mut chunks);
        chunks
    }

    /// Emit the buffer as a chunk, merging an undersized tail into the
    /// previous chunk when the merged size stays within bounds.
    fn flush(&self, buffer: &mut String, chunks: &mut Vec<(SplitChunk, bool)>) {
        let text = buffer.trim().to_string();
        buffer.clear();
        if text.is_empty() {
            return;
        }

        let token_count = self.tokenizer.count_tokens(&text);

        if token_count < self.config.min_tokens {
            if let Some((last, atomic)) = chunks.last_mut() {
                if !*atomic && last.token_count + token_count <= self.config.max_tokens {
                    last.text.push(' ');
                    last.text.push_str(&text);
                    last.token_count = self.tokenizer.count_tokens(&last.text);
                    return;
                }
            }
        }

        chunks.push((SplitChunk { text, token_count }, false));
    }

    /// Prefix each chunk after the first with the tail of its predecessor,
    /// unless the chunk already opens with near-identical text.
    fn apply_overlap(&self, chunks: &mut [(SplitChunk, bool)]) {
        if self.config.overlap_tokens == 0 {
            return;
        }

        for i in 1..chunks.len() {
            if chunks[i].1 {
                continue;
            }

            let overlap = self.overlap_suffix(&chunks[i - 1].0.text);
            if overlap.is_empty() {
                continue;
            }

            let head: String = chunks[i].0.text.chars().take(50).collect();
            if jaccard_words(&overlap, &head) >= chunking::OVERLAP_JACCARD_SKIP {
                continue;
            }

            let chunk = &mut chunks[i].0;
            chunk.text = format!("{} {}", overlap, chunk.text);
            chunk.token_count = self.tokenizer.count_tokens(&chunk.text);
        }
    }

    /// Sentence- or line-aligned suffix holding at most `overlap_tokens`.
    fn overlap_suffix(&self, text: &str) -> String {
        let units = sentence_units(text);
        let mut collected: Vec<&str> = Vec::new();
        let mut tokens = 0;

        for unit in units.iter().rev() {
            let unit_tokens = self.tokenizer.count_tokens(unit);
            if tokens + unit_tokens > self.config.overlap_tokens && tokens > 0 {
                break;
            }
            if unit_tokens > self.config.overlap_tokens && tokens == 0 {
                break;
            }
            collected.push(unit);
            tokens += unit_tokens;
        }

        collected.reverse();
        collected.join(" ").trim().to_string()
    }
}

/// Split inclusive on a separator, keeping it attached to the left part
fn split_inclusive_on(text: &str, separator: Separator) -> Vec<String> {
    match separator {
        Separator::Literal(sep) => {
            let mut parts = Vec::new();
            let mut rest = text;
            while let Some(pos) = rest.find(sep) {
                let (head, tail) = rest.split_at(pos + sep.len());
                parts.push(head.to_string());
                rest = tail;
            }
            if !rest.is_empty() {
                parts.push(rest.to_string());
            }
            parts.retain(|p| !p.trim().is_empty());
            parts
        }
        Separator::HorizontalRule => {
            let mut parts = Vec::new();
            let mut current = String::new();
            for line in text.split_inclusive('\n') {
                current.push_str(line);
                if is_horizontal_rule(line) {
                    parts.push(std::mem::take(&mut current));
                }
            }
            if !current.trim().is_empty() {
                parts.push(current);
            }
            parts.retain(|p| !p.trim().is_empty());
            parts
        }
    }
}

fn is_horizontal_rule(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3
        && (trimmed.chars().all(|c| c == '-')
            || trimmed.chars().all(|c| c == '*')
            || trimmed.chars().all(|c| c == '_'))
}

/// Sentence-ish units: sentence enders plus line breaks. The Devanagari
/// danda counts as an ender.
fn sentence_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut last_end = 0;

    for (idx, c) in text.char_indices() {
        let end = idx + c.len_utf8();
        if c == '.' || c == '?' || c == '!' || c == '।' || c == '\n' {
            let unit = text[start..end].trim();
            if !unit.is_empty() {
                units.push(text[start..end].trim());
            }
            start = end;
        }
        last_end = end;
    }

    if start < last_end {
        let unit = text[start..].trim();
        if !unit.is_empty() {
            units.push(unit);
        }
    }

    units
}

/// Word-set Jaccard similarity, lowercase
fn jaccard_words(a: &str, b: &str) -> f32 {
    let set_a: std::collections::HashSet<String> =
        a.unicode_words().map(|w| w.to_lowercase()).collect();
    let set_b: std::collections::HashSet<String> =
        b.unicode_words().map(|w| w.to_lowercase()).collect();

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f32 / union as f32
}

/// Scan for regions that must not be split: fenced code blocks, pipe
/// tables, and Q/A pairs. Returns runs of text tagged protected or not,
/// in document order.
fn protected_regions(text: &str) -> Vec<(String, bool)> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut regions: Vec<(String, bool)> = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    let mut push_plain = |plain: &mut String, regions: &mut Vec<(String, bool)>| {
        if !plain.trim().is_empty() {
            regions.push((std::mem::take(plain), false));
        } else {
            plain.clear();
        }
    };

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") {
            push_plain(&mut plain, &mut regions);
            let mut region = String::from(line);
            i += 1;
            while i < lines.len() {
                region.push_str(lines[i]);
                let closing = lines[i].trim_start().starts_with("```");
                i += 1;
                if closing {
                    break;
                }
            }
            regions.push((region, true));
            continue;
        }

        if trimmed.starts_with('|')
            && i + 1 < lines.len()
            && lines[i + 1].trim_start().starts_with('|')
        {
            push_plain(&mut plain, &mut regions);
            let mut region = String::new();
            while i < lines.len() && lines[i].trim_start().starts_with('|') {
                region.push_str(lines[i]);
                i += 1;
            }
            regions.push((region, true));
            continue;
        }

        if trimmed.starts_with("Q:") {
            // Q/A pair: capture through the A: block up to the next blank line.
            let mut region = String::from(line);
            let mut j = i + 1;
            let mut saw_answer = false;
            while j < lines.len() {
                let next = lines[j].trim();
                if next.is_empty() {
                    break;
                }
                if next.starts_with("A:") {
                    saw_answer = true;
                }
                region.push_str(lines[j]);
                j += 1;
            }
            if saw_answer {
                push_plain(&mut plain, &mut regions);
                regions.push((region, true));
                i = j;
                continue;
            }
        }

        plain.push_str(line);
        i += 1;
    }

    push_plain(&mut plain, &mut regions);
    regions
}
