//! Paragraph expansion: inline the bodies of linked notes.
//!
//! Each paragraph of the input note that contains wikilinks is replaced by
//! the bodies of the notes it links to. A body is the text after the
//! frontmatter, up to the first horizontal rule.

use regex::Regex;
use std::path::Path;

use crate::corpus::Corpus;
use crate::error::{Result, VaultError};
use crate::frontmatter;
use crate::resolve::Resolver;
use crate::vault::Vault;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandReport {
    pub input: String,
    pub output: String,
    pub paragraphs: usize,
    pub expanded: usize,
}

pub struct Expander<'a> {
    vault: &'a dyn Vault,
    resolver: Resolver<'a>,
    extensions: Vec<String>,
    paragraph_break: Regex,
    rule: Regex,
}

impl<'a> Expander<'a> {
    /// `extensions` are the note extensions an input path may already carry.
    pub fn new(vault: &'a dyn Vault, corpus: &'a Corpus, extensions: &[String]) -> Result<Self> {
        Ok(Self {
            vault,
            resolver: Resolver::new(vault, corpus)?,
            extensions: extensions.to_vec(),
            paragraph_break: Regex::new(r"\n{2,}")?,
            rule: Regex::new(r"(?m)^[ \t]*(?:-{3,}|\*{3,}|_{3,})[ \t]*$")?,
        })
    }

    /// Expand `input` and overwrite `output` with the result.
    pub fn expand_note(&self, input: &str, output: &str) -> Result<ExpandReport> {
        let input = note_path(input, &self.extensions);
        let source = self
            .vault
            .read(&input)
            .map_err(|_| VaultError::InputNotFound(input.clone()))?;

        let (text, paragraphs, expanded) = self.expand_text(&source, &input);
        self.vault.write(output, &text)?;
        log::info!(
            "expanded {} of {} paragraphs from {} into {}",
            expanded,
            paragraphs,
            input,
            output
        );

        Ok(ExpandReport {
            input,
            output: output.to_string(),
            paragraphs,
            expanded,
        })
    }

    /// Returns the expanded text with paragraph and expansion counts.
    pub fn expand_text(&self, source: &str, from: &str) -> (String, usize, usize) {
        let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
        let mut out: Vec<String> = Vec::new();
        let mut expanded = 0;

        for paragraph in self.paragraph_break.split(&normalized) {
            if !self.resolver.parser().has_wikilink(paragraph) {
                out.push(paragraph.to_string());
                continue;
            }
            match self.expand_paragraph(paragraph, from) {
                Some(text) => {
                    expanded += 1;
                    out.push(text);
                }
                None => out.push(paragraph.to_string()),
            }
        }

        let paragraphs = out.len();
        (out.join("\n\n"), paragraphs, expanded)
    }

    fn expand_paragraph(&self, paragraph: &str, from: &str) -> Option<String> {
        let mut chunks: Vec<String> = Vec::new();
        for target in self.resolver.parser().inline_targets(paragraph) {
            let Some(resolution) = self.resolver.resolve(&target, from) else {
                log::debug!("no note for [[{}]] in {}", target, from);
                continue;
            };
            match self.vault.read(&resolution.document.path) {
                Ok(content) => {
                    let body = self.leading_body(&content);
                    if !body.is_empty() {
                        chunks.push(body.to_string());
                    }
                }
                Err(e) => log::warn!("cannot read {}: {}", resolution.document.path, e),
            }
        }

        if chunks.is_empty() {
            None
        } else {
            Some(chunks.join("\n\n"))
        }
    }

    /// Body text after the frontmatter, cut at the first horizontal rule.
    pub fn leading_body<'t>(&self, content: &'t str) -> &'t str {
        let body = frontmatter::body(content);
        let body = match self.rule.find(body) {
            Some(m) => &body[..m.start()],
            None => body,
        };
        body.trim()
    }
}

fn note_path(input: &str, extensions: &[String]) -> String {
    let trimmed = input.trim().trim_start_matches('/');
    let has_extension = Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
    if has_extension {
        trimmed.to_string()
    } else {
        format!("{}.md", trimmed)
    }
}
