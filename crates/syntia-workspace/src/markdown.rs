// ABOUTME: Markdown rendering for the preview panel.
// ABOUTME: The default renderer turns markdown into plain text blocks line by line.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem { depth: usize, text: String },
    Quote(String),
    Code { language: Option<String>, lines: Vec<String> },
    Rule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewDocument {
    /// Text of the first heading
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl PreviewDocument {
    /// Flatten for display in a plain text widget
    pub fn to_plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading { level, text } => {
                    lines.push(text.to_uppercase());
                    if *level <= 2 {
                        lines.push("=".repeat(text.chars().count()));
                    }
                }
                Block::Paragraph(text) => lines.push(text.clone()),
                Block::ListItem { depth, text } => {
                    lines.push(format!("{}• {}", "  ".repeat(*depth), text));
                }
                Block::Quote(text) => lines.push(format!("│ {text}")),
                Block::Code { lines: code, .. } => {
                    lines.extend(code.iter().map(|l| format!("    {l}")));
                }
                Block::Rule => lines.push("─".repeat(40)),
            }
            lines.push(String::new());
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}

pub trait MarkdownRenderer {
    fn render(&self, text: &str) -> PreviewDocument;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainMarkdownRenderer;

impl MarkdownRenderer for PlainMarkdownRenderer {
    fn render(&self, text: &str) -> PreviewDocument {
        let mut blocks = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut code: Option<(Option<String>, Vec<String>)> = None;

        let flush = |paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>| {
            if !paragraph.is_empty() {
                blocks.push(Block::Paragraph(paragraph.join(" ")));
                paragraph.clear();
            }
        };

        for line in text.lines() {
            let trimmed = line.trim_start();

            if let Some((language, lines)) = &mut code {
                if trimmed.starts_with("```") {
                    blocks.push(Block::Code {
                        language: language.take(),
                        lines: std::mem::take(lines),
                    });
                    code = None;
                } else {
                    lines.push(line.to_string());
                }
                continue;
            }

            if let Some(info) = trimmed.strip_prefix("```") {
                flush(&mut paragraph, &mut blocks);
                let info = info.trim();
                code = Some(((!info.is_empty()).then(|| info.to_string()), Vec::new()));
                continue;
            }

            if trimmed.is_empty() {
                flush(&mut paragraph, &mut blocks);
                continue;
            }

            if let Some(block) = line_block(line) {
                flush(&mut paragraph, &mut blocks);
                blocks.push(block);
            } else {
                paragraph.push(trimmed.trim_end());
            }
        }

        flush(&mut paragraph, &mut blocks);
        // Unterminated fence runs to the end of the document
        if let Some((language, lines)) = code {
            blocks.push(Block::Code { language, lines });
        }

        let title = blocks.iter().find_map(|b| match b {
            Block::Heading { text, .. } => Some(text.clone()),
            _ => None,
        });

        PreviewDocument { title, blocks }
    }
}

/// Blocks that always occupy exactly one source line
fn line_block(line: &str) -> Option<Block> {
    let indent = line.len() - line.trim_start().len();
    let trimmed = line.trim();

    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) {
        let rest = &trimmed[hashes..];
        if rest.is_empty() || rest.starts_with(' ') {
            return Some(Block::Heading {
                level: hashes as u8,
                text: rest.trim().trim_end_matches('#').trim_end().to_string(),
            });
        }
    }

    if trimmed.len() >= 3
        && ['-', '*', '_']
            .into_iter()
            .any(|m| trimmed.chars().all(|c| c == m || c == ' '))
    {
        return Some(Block::Rule);
    }

    for marker in ["- ", "* ", "+ "] {
        if let Some(text) = trimmed.strip_prefix(marker) {
            return Some(Block::ListItem {
                depth: indent / 2,
                text: text.trim().to_string(),
            });
        }
    }

    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(text) = trimmed[digits..].strip_prefix(". ") {
            return Some(Block::ListItem {
                depth: indent / 2,
                text: text.trim().to_string(),
            });
        }
    }

    if let Some(text) = trimmed.strip_prefix('>') {
        return Some(Block::Quote(text.trim().to_string()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(text: &str) -> PreviewDocument {
        PlainMarkdownRenderer.render(text)
    }

    #[test]
    fn headings_paragraphs_and_title() {
        let doc = render("# Readme\n\nSome text\nacross lines.\n\n## Usage ##\n");
        assert_eq!(doc.title.as_deref(), Some("Readme"));
        assert_eq!(
            doc.blocks,
            vec![
                Block::Heading { level: 1, text: "Readme".into() },
                Block::Paragraph("Some text across lines.".into()),
                Block::Heading { level: 2, text: "Usage".into() },
            ]
        );
    }

    #[test]
    fn lists_quotes_and_rules() {
        let doc = render("- one\n  - nested\n1. first\n> quoted\n---\n#hashtag");
        assert_eq!(
            doc.blocks,
            vec![
                Block::ListItem { depth: 0, text: "one".into() },
                Block::ListItem { depth: 1, text: "nested".into() },
                Block::ListItem { depth: 0, text: "first".into() },
                Block::Quote("quoted".into()),
                Block::Rule,
                Block::Paragraph("#hashtag".into()),
            ]
        );
        assert_eq!(doc.title, None);
    }

    #[test]
    fn fenced_code_keeps_lines() {
        let doc = render("```rust\nfn main() {\n    # not a heading\n}\n```\nafter");
        assert_eq!(
            doc.blocks,
            vec![
                Block::Code {
                    language: Some("rust".into()),
                    lines: vec!["fn main() {".into(), "    # not a heading".into(), "}".into()],
                },
                Block::Paragraph("after".into()),
            ]
        );
    }

    #[test]
    fn unterminated_fence() {
        let doc = render("```\nlet x = 1;");
        assert_eq!(
            doc.blocks,
            vec![Block::Code { language: None, lines: vec!["let x = 1;".into()] }]
        );
    }

    #[test]
    fn plain_text_output() {
        let doc = render("# Hi\n\n- a\n\ntext");
        assert_eq!(doc.to_plain_text(), "HI\n==\n\n• a\n\ntext");
    }
}
