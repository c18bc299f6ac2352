use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::corpus::{Corpus, Document};
use crate::error::{Result, VaultError};
use crate::frontmatter::scalar_string;
use crate::link::{basename_no_ext, strip_extension};
use crate::resolve::Resolver;
use crate::vault::Vault;

/// Keys computed by the indexer; frontmatter values under these names are replaced.
const COMPUTED_KEYS: &[&str] = &["slug", "file", "vaultlink", "mtime", "inherits", "position"];

/// One indexed note: its frontmatter plus the fields the indexer derives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub slug: String,
    /// Absolute path of the note on disk.
    pub file: String,
    /// Vault-relative path without extension, usable as a wikilink target.
    pub vaultlink: String,
    pub mtime: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<Vec<String>>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl IndexRecord {
    pub fn title(&self) -> Option<String> {
        self.fields
            .get("title")
            .and_then(scalar_string)
            .filter(|s| !s.is_empty())
    }

    pub fn label(&self) -> Option<String> {
        self.fields
            .get("label")
            .and_then(scalar_string)
            .filter(|s| !s.is_empty())
    }

    /// Heading text for the readable index: title, else the file's basename.
    pub fn heading(&self) -> String {
        self.title()
            .unwrap_or_else(|| basename_no_ext(&self.file).to_string())
    }
}

/// Result of one indexing run.
#[derive(Debug, Default)]
pub struct BuildOutput {
    pub index: BTreeMap<String, IndexRecord>,
    /// `"{slug}: {winner} overrides {shadowed}"`, one per shadowed note.
    pub overrides: Vec<String>,
    /// Inherits entries that could not be turned into a slug.
    pub problems: Vec<String>,
    /// Notes that declared a slug, before arbitration.
    pub candidates: usize,
}

impl BuildOutput {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.index)?)
    }
}

struct Candidate<'a> {
    document: &'a Document,
    record: IndexRecord,
}

/// Build the slug index for every note in the corpus.
///
/// Duplicate slugs keep the note with the lowest origin rank, then the
/// smallest path. Unresolvable `inherits` entries become problems, or a
/// [`VaultError::Validation`] listing all of them when `strict` is set.
pub fn build_index(vault: &dyn Vault, corpus: &Corpus, strict: bool) -> Result<BuildOutput> {
    let resolver = Resolver::new(vault, corpus)?;
    let mut problems: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    let mut candidates = 0;

    for document in corpus.documents() {
        let Some(fm) = vault.metadata(&document.path) else {
            continue;
        };
        let Some(slug) = fm.slug() else {
            log::debug!("{} has no slug, skipping", document.path);
            continue;
        };

        let mut fields: BTreeMap<String, Value> = fm
            .record_fields()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        fields.retain(|k, _| !COMPUTED_KEYS.contains(&k.as_str()));

        let inherits = fm
            .inherits()
            .map(|entries| resolve_inherits(&resolver, vault, document, entries, &mut problems));

        let mtime = vault.modified(&document.path).unwrap_or_else(|e| {
            log::warn!("cannot stat {}: {}", document.path, e);
            chrono::Utc::now().timestamp()
        });

        let record = IndexRecord {
            slug: slug.to_string(),
            file: path_string(&vault.absolute_path(&document.path)),
            vaultlink: strip_extension(&document.path).to_string(),
            mtime,
            inherits,
            fields,
        };

        candidates += 1;
        groups
            .entry(slug.to_string())
            .or_default()
            .push(Candidate { document, record });
    }

    if strict && !problems.is_empty() {
        return Err(VaultError::Validation { problems });
    }

    let mut index = BTreeMap::new();
    let mut overrides = Vec::new();
    for (slug, mut group) in groups {
        group.sort_by(|a, b| {
            (a.document.rank, &a.document.path).cmp(&(b.document.rank, &b.document.path))
        });
        let mut group = group.into_iter();
        let Some(winner) = group.next() else {
            continue;
        };
        for shadowed in group {
            log::info!(
                "{}: {} overrides {}",
                slug,
                winner.document.path,
                shadowed.document.path
            );
            overrides.push(format!(
                "{}: {} overrides {}",
                slug, winner.document.path, shadowed.document.path
            ));
        }
        index.insert(slug, winner.record);
    }

    Ok(BuildOutput {
        index,
        overrides,
        problems,
        candidates,
    })
}

/// Turn `inherits` entries into target slugs, first occurrence wins.
fn resolve_inherits(
    resolver: &Resolver,
    vault: &dyn Vault,
    source: &Document,
    entries: &[Value],
    problems: &mut Vec<String>,
) -> Vec<String> {
    let mut slugs: Vec<String> = Vec::new();

    for raw in entries {
        let resolved = scalar_string(raw).and_then(|token| resolver.resolve(&token, &source.path));
        let Some(resolution) = resolved else {
            problems.push(format!(
                "Unresolved inherits link in {}: {}",
                source.path, raw
            ));
            continue;
        };

        let target = resolution.document;
        let target_slug = vault
            .metadata(&target.path)
            .and_then(|fm| fm.slug().map(str::to_string));
        match target_slug {
            Some(slug) => {
                if !slugs.contains(&slug) {
                    slugs.push(slug);
                }
            }
            None => problems.push(format!(
                "Inherits link in {} resolves to {} which is not indexed",
                source.path, target.path
            )),
        }
    }

    slugs
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Read a previously written index back from disk.
pub fn load_index(path: &Path) -> Result<BTreeMap<String, IndexRecord>> {
    let content =
        std::fs::read_to_string(path).map_err(|_| VaultError::IndexNotFound(path.to_path_buf()))?;
    Ok(serde_json::from_str(&content)?)
}
