//! Reference resolution with local-over-remote preference.
//!
//! Lookup order for a reference written in a note:
//!
//! 1. the vault's own short-hand link resolution, without and then with `.md`
//! 2. absolute filesystem paths, matched by basename
//! 3. vault-relative paths, case-insensitive
//! 4. basename anywhere in the vault
//!
//! Whenever a fallback has several candidates the note with the lowest
//! origin rank wins, then the lexicographically first path.

use ahash::AHashMap;
use std::fmt;

use crate::corpus::{Corpus, Document};
use crate::error::Result;
use crate::link::{basename_no_ext, strip_extension, LinkParser};
use crate::vault::Vault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStep {
    LinkPath,
    AbsoluteBasename,
    VaultPath,
    Basename,
}

impl fmt::Display for ResolveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolveStep::LinkPath => "link path",
            ResolveStep::AbsoluteBasename => "absolute path basename",
            ResolveStep::VaultPath => "vault path",
            ResolveStep::Basename => "basename",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub document: &'a Document,
    pub step: ResolveStep,
}

pub struct Resolver<'a> {
    vault: &'a dyn Vault,
    corpus: &'a Corpus,
    parser: LinkParser,
    // lowercase path without extension → best document index
    by_path: AHashMap<String, usize>,
    // lowercase basename without extension → indices, best first
    by_basename: AHashMap<String, Vec<usize>>,
}

impl<'a> Resolver<'a> {
    pub fn new(vault: &'a dyn Vault, corpus: &'a Corpus) -> Result<Self> {
        let docs = corpus.documents();
        let mut by_path: AHashMap<String, usize> = AHashMap::new();
        let mut by_basename: AHashMap<String, Vec<usize>> = AHashMap::new();

        for (i, doc) in docs.iter().enumerate() {
            let no_ext = strip_extension(&doc.path);
            let path_key = no_ext.to_lowercase();
            let base_key = basename_no_ext(&doc.path).to_lowercase();

            match by_path.get(&path_key) {
                Some(&prev) if !prefer(doc, &docs[prev]) => {}
                _ => {
                    by_path.insert(path_key, i);
                }
            }
            by_basename.entry(base_key).or_default().push(i);
        }

        // Corpus order is by path, so a stable sort on rank gives (rank, path).
        for candidates in by_basename.values_mut() {
            candidates.sort_by_key(|&i| docs[i].rank);
        }

        Ok(Self {
            vault,
            corpus,
            parser: LinkParser::new()?,
            by_path,
            by_basename,
        })
    }

    pub fn parser(&self) -> &LinkParser {
        &self.parser
    }

    /// Resolve a raw reference written inside the note at `from`.
    pub fn resolve(&self, raw: &str, from: &str) -> Option<Resolution<'a>> {
        let text = self.parser.link_text(raw)?;
        let found = self.resolve_text(&text, from);
        match &found {
            Some(r) => log::debug!(
                "{:?} in {} -> {} ({})",
                raw,
                from,
                r.document.path,
                r.step
            ),
            None => log::debug!("{:?} in {} did not resolve", raw, from),
        }
        found
    }

    fn resolve_text(&self, text: &str, from: &str) -> Option<Resolution<'a>> {
        let corpus: &'a Corpus = self.corpus;

        for candidate in [text.to_string(), format!("{}.md", text)] {
            if let Some(doc) = self
                .vault
                .resolve_link_path(&candidate, from)
                .and_then(|path| corpus.get(&path))
            {
                return Some(Resolution {
                    document: doc,
                    step: ResolveStep::LinkPath,
                });
            }
        }

        if self.parser.is_absolute(text) {
            if let Some(doc) = self.best_by_basename(text) {
                return Some(Resolution {
                    document: doc,
                    step: ResolveStep::AbsoluteBasename,
                });
            }
        }

        let key = text.trim_start_matches('/').to_lowercase();
        if let Some(&i) = self.by_path.get(&key) {
            return Some(Resolution {
                document: &corpus.documents()[i],
                step: ResolveStep::VaultPath,
            });
        }

        self.best_by_basename(text).map(|doc| Resolution {
            document: doc,
            step: ResolveStep::Basename,
        })
    }

    fn best_by_basename(&self, text: &str) -> Option<&'a Document> {
        let corpus: &'a Corpus = self.corpus;
        let key = basename_no_ext(text).to_lowercase();
        self.by_basename
            .get(&key)
            .and_then(|candidates| candidates.first())
            .map(|&i| &corpus.documents()[i])
    }
}

fn prefer(candidate: &Document, current: &Document) -> bool {
    (candidate.rank, &candidate.path) < (current.rank, &current.path)
}
