use crate::error::Result;
use crate::vault::Vault;

/// Rank of notes owned by the vault being indexed.
pub const LOCAL_RANK: u8 = 0;
/// Rank of notes under a remote root.
pub const REMOTE_RANK: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub rank: u8,
}

/// The eligible notes of one run, sorted by path.
#[derive(Debug, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Document> {
        self.documents
            .binary_search_by(|d| d.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.documents[i])
    }
}

pub fn origin_rank(path: &str, remote_roots: &[String]) -> u8 {
    let remote = remote_roots.iter().filter(|r| !r.is_empty()).any(|root| {
        path == root
            || path
                .strip_prefix(root.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    });
    if remote {
        REMOTE_RANK
    } else {
        LOCAL_RANK
    }
}

/// Enumerate the vault and attach an origin rank to every note.
pub fn load_corpus(vault: &dyn Vault, remote_roots: &[String]) -> Result<Corpus> {
    let mut documents: Vec<Document> = vault
        .markdown_files()?
        .iter()
        .map(|path| Document {
            path: path.clone(),
            rank: origin_rank(path, remote_roots),
        })
        .collect();
    documents.sort_by(|a, b| a.path.cmp(&b.path));
    documents.dedup_by(|a, b| a.path == b.path);

    let remote = documents.iter().filter(|d| d.rank == REMOTE_RANK).count();
    log::info!(
        "loaded {} notes ({} local, {} remote)",
        documents.len(),
        documents.len() - remote,
        remote
    );
    Ok(Corpus { documents })
}
