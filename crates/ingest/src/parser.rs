//! Document parsing
//!
//! Plain-text and markdown files parse locally. Everything else goes to the
//! external parser service with retry (3 attempts, exponential backoff,
//! retried only on network errors, timeouts, and 5xx); when the service is
//! exhausted or rejects the file, a lossy local fallback keeps ingestion
//! moving.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::IngestError;
use vaani_config::constants::{ingest, timeouts};

/// Element kinds the chunker understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Heading,
    Paragraph,
    Table,
    List,
    Code,
}

/// One structural element of a parsed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredElement {
    #[serde(rename = "type")]
    pub element_type: ElementType,
    #[serde(default)]
    pub level: Option<u8>,
    pub text: String,
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub children: Vec<StructuredElement>,
}

fn default_page() -> u32 {
    1
}

/// Parser output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub filename: String,
    pub file_type: String,
    pub file_size: u64,
    pub content: String,
    pub pages: u32,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub elements: Vec<StructuredElement>,
}

/// Parser configuration
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// External parser service; `None` forces local parsing
    pub service_url: Option<String>,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub request_timeout: Duration,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            service_url: Some(vaani_config::constants::endpoints::PARSER_DEFAULT.to_string()),
            max_retries: ingest::PARSER_MAX_RETRIES,
            backoff_base: Duration::from_millis(ingest::PARSER_BACKOFF_BASE_MS),
            backoff_cap: Duration::from_millis(ingest::PARSER_BACKOFF_CAP_MS),
            request_timeout: Duration::from_millis(timeouts::PARSER_REQUEST_MS),
        }
    }
}

#[derive(Serialize)]
struct RemoteParseRequest<'a> {
    filename: &'a str,
    data: String,
}

/// File parser with remote service and local fallback
pub struct DocumentParser {
    client: reqwest::Client,
    config: ParserConfig,
}

impl DocumentParser {
    pub fn new(config: ParserConfig) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IngestError::RemoteParser(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Parse a file into content plus structured elements
    pub async fn parse_file(&self, path: &Path) -> Result<ParsedDocument, IngestError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_type = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let file_size = tokio::fs::metadata(path).await?.len();

        // Plain text never touches the external service.
        if matches!(file_type.as_str(), "txt" | "md" | "markdown" | "text" | "") {
            let content = tokio::fs::read_to_string(path).await?;
            return Ok(self.local_parse(filename, file_type, file_size, content));
        }

        let bytes = tokio::fs::read(path).await?;
        match self.parse_remote(&filename, &bytes).await {
            Ok(mut parsed) => {
                parsed.file_size = file_size;
                Ok(parsed)
            }
            Err(e) => {
                tracing::warn!(
                    filename = filename.as_str(),
                    error = %e,
                    "remote parse failed, using local fallback"
                );
                let content = String::from_utf8_lossy(&bytes).to_string();
                Ok(self.local_parse(filename, file_type, file_size, content))
            }
        }
    }

    async fn parse_remote(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ParsedDocument, IngestError> {
        let url = match &self.config.service_url {
            Some(url) if !url.is_empty() => format!("{}/parse", url.trim_end_matches('/')),
            _ => return Err(IngestError::RemoteParser("no parser service configured".into())),
        };

        let request = RemoteParseRequest {
            filename,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.client.post(&url).json(&request).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<ParsedDocument>()
                            .await
                            .map_err(|e| IngestError::RemoteParser(e.to_string()));
                    }
                    if status.is_server_error() && attempt <= self.config.max_retries {
                        self.backoff(attempt).await;
                        continue;
                    }
                    // 4xx: the service rejected the file; no point retrying.
                    return Err(IngestError::RemoteParser(format!(
                        "parser service returned {}",
                        status
                    )));
                }
                Err(e) if (e.is_timeout() || e.is_connect() || e.is_request())
                    && attempt <= self.config.max_retries =>
                {
                    tracing::debug!(attempt, error = %e, "parser request failed, retrying");
                    self.backoff(attempt).await;
                }
                Err(e) => return Err(IngestError::RemoteParser(e.to_string())),
            }
        }
    }

    async fn backoff(&self, attempt: u32) {
        let exp = self
            .config
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.config.backoff_cap);
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
        tokio::time::sleep(capped + jitter).await;
    }

    fn local_parse(
        &self,
        filename: String,
        file_type: String,
        file_size: u64,
        content: String,
    ) -> ParsedDocument {
        let flat = parse_markdown(&content);
        let elements = build_hierarchy(flat);

        ParsedDocument {
            filename,
            file_type,
            file_size,
            content,
            pages: 1,
            metadata: HashMap::new(),
            elements,
        }
    }
}

/// Line-oriented markdown scan into flat elements
pub fn parse_markdown(content: &str) -> Vec<StructuredElement> {
    let mut elements = Vec::new();
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.is_empty() {
            i += 1;
            continue;
        }

        // Heading
        if let Some(level) = heading_level(trimmed) {
            elements.push(StructuredElement {
                element_type: ElementType::Heading,
                level: Some(level),
                text: trimmed.trim_start_matches('#').trim().to_string(),
                markdown: Some(trimmed.to_string()),
                page: 1,
                children: Vec::new(),
            });
            i += 1;
            continue;
        }

        // Fenced code block
        if trimmed.starts_with("```") {
            let mut block = vec![line.to_string()];
            i += 1;
            while i < lines.len() {
                block.push(lines[i].to_string());
                let closing = lines[i].trim().starts_with("```");
                i += 1;
                if closing {
                    break;
                }
            }
            let markdown = block.join("\n");
            elements.push(StructuredElement {
                element_type: ElementType::Code,
                level: None,
                text: markdown.clone(),
                markdown: Some(markdown),
                page: 1,
                children: Vec::new(),
            });
            continue;
        }

        // Pipe table
        if trimmed.starts_with('|') {
            let mut rows = Vec::new();
            while i < lines.len() && lines[i].trim().starts_with('|') {
                rows.push(lines[i].to_string());
                i += 1;
            }
            let markdown = rows.join("\n");
            elements.push(StructuredElement {
                element_type: ElementType::Table,
                level: None,
                text: markdown.clone(),
                markdown: Some(markdown),
                page: 1,
                children: Vec::new(),
            });
            continue;
        }

        // List block
        if is_list_item(trimmed) {
            let mut items = Vec::new();
            while i < lines.len() && is_list_item(lines[i].trim()) {
                items.push(lines[i].trim().to_string());
                i += 1;
            }
            elements.push(StructuredElement {
                element_type: ElementType::List,
                level: None,
                text: items.join("\n"),
                markdown: Some(items.join("\n")),
                page: 1,
                children: Vec::new(),
            });
            continue;
        }

        // Paragraph: collect until blank line or structural marker
        let mut para = Vec::new();
        while i < lines.len() {
            let t = lines[i].trim();
            if t.is_empty() || heading_level(t).is_some() || t.starts_with("```")
                || t.starts_with('|') || is_list_item(t)
            {
                break;
            }
            para.push(t.to_string());
            i += 1;
        }
        elements.push(StructuredElement {
            element_type: ElementType::Paragraph,
            level: None,
            text: para.join(" "),
            markdown: None,
            page: 1,
            children: Vec::new(),
        });
    }

    elements
}

fn heading_level(line: &str) -> Option<u8> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) && line.chars().nth(hashes) == Some(' ') {
        Some(hashes as u8)
    } else {
        None
    }
}

fn is_list_item(line: &str) -> bool {
    if line.starts_with("- ") || line.starts_with("* ") || line.starts_with("• ") {
        return true;
    }
    let digits: String = line.chars().take_while(|c| c.is_ascii_digit()).collect();
    !digits.is_empty() && line[digits.len()..].starts_with(". ")
}

/// Stack headings by level; non-headings attach to the most recent heading.
pub fn build_hierarchy(flat: Vec<StructuredElement>) -> Vec<StructuredElement> {
    let mut roots: Vec<StructuredElement> = Vec::new();
    // Open headings, innermost last. A finished heading folds into its
    // parent (or the root list) when a same-or-higher level arrives.
    let mut open: Vec<(u8, StructuredElement)> = Vec::new();

    let close_down_to =
        |open: &mut Vec<(u8, StructuredElement)>, roots: &mut Vec<StructuredElement>, level: u8| {
            while let Some((top_level, _)) = open.last() {
                if *top_level >= level {
                    let (_, finished) = open.pop().expect("non-empty");
                    match open.last_mut() {
                        Some((_, parent)) => parent.children.push(finished),
                        None => roots.push(finished),
                    }
                } else {
                    break;
                }
            }
        };

    for element in flat {
        match element.element_type {
            ElementType::Heading => {
                let level = element.level.unwrap_or(1);
                close_down_to(&mut open, &mut roots, level);
                open.push((level, element));
            }
            _ => match open.last_mut() {
                Some((_, heading)) => heading.children.push(element),
                None => roots.push(element),
            },
        }
    }

    close_down_to(&mut open, &mut roots, 0);
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_markdown_elements() {
        let content = "# Title\n\nIntro paragraph here.\n\n## Section\n\n- one\n- two\n\n| a | b |\n| 1 | 2 |\n\n```rust\nfn x() {}\n```";
        let flat = parse_markdown(content);

        let kinds: Vec<ElementType> = flat.iter().map(|e| e.element_type).collect();
        assert_eq!(
            kinds,
            vec![
                ElementType::Heading,
                ElementType::Paragraph,
                ElementType::Heading,
                ElementType::List,
                ElementType::Table,
                ElementType::Code,
            ]
        );
    }

    #[test]
    fn test_hierarchy_nesting() {
        let content = "# Top\n\nTop paragraph.\n\n## Inner\n\nInner paragraph.\n\n# Second\n\nSecond paragraph.";
        let tree = build_hierarchy(parse_markdown(content));

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].text, "Top");
        // Top owns its paragraph and the Inner heading.
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[1].text, "Inner");
        assert_eq!(tree[0].children[1].children.len(), 1);
        assert_eq!(tree[1].text, "Second");
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("# One"), Some(1));
        assert_eq!(heading_level("### Three"), Some(3));
        assert_eq!(heading_level("#NoSpace"), None);
        assert_eq!(heading_level("plain"), None);
    }

    #[tokio::test]
    async fn test_plain_text_bypasses_service() {
        // service_url points nowhere; .txt must still parse locally.
        let parser = DocumentParser::new(ParserConfig {
            service_url: Some("http://127.0.0.1:1".into()),
            ..Default::default()
        })
        .unwrap();

        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "Some plain text content.").unwrap();

        let parsed = parser.parse_file(file.path()).await.unwrap();
        assert!(parsed.content.contains("plain text"));
        assert_eq!(parsed.pages, 1);
        assert!(!parsed.elements.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_format_falls_back_locally() {
        // Unreachable service: after retries the lossy local parse applies.
        let parser = DocumentParser::new(ParserConfig {
            service_url: Some("http://127.0.0.1:1".into()),
            max_retries: 1,
            backoff_base: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(2),
            request_timeout: Duration::from_millis(200),
        })
        .unwrap();

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a,b,c").unwrap();

        let parsed = parser.parse_file(file.path()).await.unwrap();
        assert!(parsed.content.contains("a,b,c"));
    }
}
