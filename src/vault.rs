//! Access to the note store.
//!
//! Everything the indexer needs from storage goes through the [`Vault`]
//! trait so the resolution and indexing code never touches the filesystem
//! directly. [`FsVault`] is the on-disk implementation used by the CLI.

use ahash::AHashMap;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::cell::{OnceCell, RefCell};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::time::UNIX_EPOCH;

use crate::config::Config;
use crate::error::{Result, VaultError};
use crate::frontmatter::{extract_frontmatter, Frontmatter};

pub trait Vault {
    /// Vault-relative paths of every eligible note, sorted lexicographically.
    fn markdown_files(&self) -> Result<Rc<[String]>>;

    /// Cached frontmatter; `None` for notes without a readable header.
    fn metadata(&self, path: &str) -> Option<Rc<Frontmatter>>;

    /// Last write time in seconds since the epoch.
    fn modified(&self, path: &str) -> Result<i64>;

    fn read(&self, path: &str) -> Result<String>;

    /// Overwrite a vault-relative file, creating parent folders as needed.
    fn write(&self, path: &str, content: &str) -> Result<()>;

    fn absolute_path(&self, path: &str) -> PathBuf;

    /// Short-hand link resolution: the note a bare link text points at when
    /// written inside `from`, or `None` when the link is missing or ambiguous.
    fn resolve_link_path(&self, link: &str, from: &str) -> Option<String>;
}

/// Folder-name globs whose matches are pruned from traversal together with
/// everything below them.
#[derive(Debug, Clone)]
pub struct FolderFilter {
    set: GlobSet,
}

impl FolderFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    pub fn is_excluded(&self, folder_name: &str) -> bool {
        self.set.is_match(folder_name)
    }

    /// True when any folder segment of a vault-relative file path is excluded.
    pub fn excludes_path(&self, path: &str) -> bool {
        let mut segments: Vec<&str> = path.split('/').collect();
        segments.pop();
        segments.iter().any(|s| self.is_excluded(s))
    }
}

pub struct FsVault {
    root: PathBuf,
    filter: FolderFilter,
    extensions: Vec<String>,
    files: OnceCell<Rc<[String]>>,
    links: OnceCell<LinkTable>,
    cache: RefCell<AHashMap<String, Option<Rc<Frontmatter>>>>,
}

impl FsVault {
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        if !root.is_dir() {
            return Err(VaultError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("vault root is not a directory: {}", root.display()),
            )));
        }
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        Ok(Self {
            root,
            filter: FolderFilter::new(&config.excluded_folders)?,
            extensions: config.extensions.clone(),
            files: OnceCell::new(),
            links: OnceCell::new(),
            cache: RefCell::new(AHashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self) -> Result<Vec<String>> {
        let filter = self.filter.clone();
        let mut builder = WalkBuilder::new(&self.root);
        // Remote roots are usually symlinked vaults.
        builder
            .standard_filters(false)
            .hidden(true)
            .follow_links(true)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if !is_dir || entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                if filter.is_excluded(&name) {
                    log::debug!("pruning excluded folder {}", entry.path().display());
                    return false;
                }
                true
            });

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == Some(0) => return Err(e.into()),
                Err(e) => {
                    log::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if !self.extensions.contains(&ext) {
                continue;
            }

            if let Ok(relative) = path.strip_prefix(&self.root) {
                files.push(to_vault_path(relative));
            }
        }

        files.sort();
        files.dedup();
        log::debug!("found {} notes under {}", files.len(), self.root.display());
        Ok(files)
    }
}

impl Vault for FsVault {
    fn markdown_files(&self) -> Result<Rc<[String]>> {
        if let Some(files) = self.files.get() {
            return Ok(Rc::clone(files));
        }
        let files: Rc<[String]> = self.walk()?.into();
        Ok(Rc::clone(self.files.get_or_init(|| files)))
    }

    fn metadata(&self, path: &str) -> Option<Rc<Frontmatter>> {
        if let Some(cached) = self.cache.borrow().get(path) {
            return cached.clone();
        }

        let parsed = match fs::read_to_string(self.absolute_path(path)) {
            Ok(content) => match extract_frontmatter(&content) {
                Ok(fm) => fm.map(Rc::new),
                Err(e) => {
                    log::warn!("ignoring malformed frontmatter in {}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::warn!("cannot read {}: {}", path, e);
                None
            }
        };

        self.cache
            .borrow_mut()
            .insert(path.to_string(), parsed.clone());
        parsed
    }

    fn modified(&self, path: &str) -> Result<i64> {
        let modified = fs::metadata(self.absolute_path(path))?.modified()?;
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64)
    }

    fn read(&self, path: &str) -> Result<String> {
        Ok(fs::read_to_string(self.absolute_path(path))?)
    }

    fn write(&self, path: &str, content: &str) -> Result<()> {
        let target = self.absolute_path(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, content)?;
        Ok(())
    }

    fn absolute_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn resolve_link_path(&self, link: &str, from: &str) -> Option<String> {
        if self.links.get().is_none() {
            let files = self.markdown_files().ok()?;
            let _ = self.links.set(LinkTable::new(&files));
        }
        self.links.get()?.find(link, from)
    }
}

fn to_vault_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve `link` against the folder containing `from`, collapsing `.` and
/// `..` segments. A leading slash anchors the link at the vault root.
pub fn join_relative(from: &str, link: &str) -> String {
    let mut segments: Vec<&str> = if link.starts_with('/') {
        Vec::new()
    } else {
        let dir = from.rfind('/').map(|i| &from[..i]).unwrap_or("");
        dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for part in link.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Link-path lookup shared by the vault implementations.
///
/// Case-insensitive. Tries the link relative to the source folder, then as
/// a vault-root path, then as a unique path suffix. Built once per file list.
#[derive(Debug, Default)]
pub struct LinkTable {
    // lowercase path → first path in sorted order
    by_path: AHashMap<String, String>,
    // lowercase trailing segments (`deep/b.md`, `b.md`) → every matching path
    by_suffix: AHashMap<String, Vec<String>>,
}

impl LinkTable {
    pub fn new(files: &[String]) -> Self {
        let mut table = Self::default();
        for file in files {
            let lower = file.to_lowercase();
            for (i, _) in lower.match_indices('/') {
                table
                    .by_suffix
                    .entry(lower[i + 1..].to_string())
                    .or_default()
                    .push(file.clone());
            }
            table.by_path.entry(lower).or_insert_with(|| file.clone());
        }
        table
    }

    pub fn find(&self, link: &str, from: &str) -> Option<String> {
        let link = link.trim();
        if link.is_empty() {
            return None;
        }

        let relative = join_relative(from, link).to_lowercase();
        if let Some(hit) = self.by_path.get(&relative) {
            return Some(hit.clone());
        }

        let rooted = link.trim_start_matches('/').to_lowercase();
        if let Some(hit) = self.by_path.get(&rooted) {
            return Some(hit.clone());
        }

        match self.by_suffix.get(&rooted).map(Vec::as_slice) {
            Some([only]) => Some(only.clone()),
            _ => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn write_note(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_folder_filter_is_case_insensitive() {
        let filter = FolderFilter::new(&["*templates*".to_string()]).unwrap();
        assert!(filter.is_excluded("Templates"));
        assert!(filter.is_excluded("_templates_old"));
        assert!(!filter.is_excluded("notes"));
        assert!(filter.excludes_path("a/TEMPLATES/b/c.md"));
        assert!(!filter.excludes_path("templates.md"));
    }

    #[test]
    fn test_walk_prunes_excluded_and_hidden_folders() {
        let dir = tempfile::tempdir().unwrap();
        write_note(dir.path(), "b.md", "");
        write_note(dir.path(), "a/one.md", "");
        write_note(dir.path(), "a/two.txt", "");
        write_note(dir.path(), "Templates/system.md", "");
        write_note(dir.path(), "deep/templates/inner/x.md", "");
        write_note(dir.path(), ".obsidian/workspace.md", "");

        let vault = FsVault::open(dir.path(), &Config::default()).unwrap();
        let files = vault.markdown_files().unwrap();
        assert_eq!(files.to_vec(), vec!["a/one.md", "b.md"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsVault::open(&dir.path().join("nope"), &Config::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_metadata_is_cached_and_malformed_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_note(dir.path(), "good.md", "---\nslug: good\n---\n");
        write_note(dir.path(), "bad.md", "---\nslug: [oops\n---\n");

        let vault = FsVault::open(dir.path(), &Config::default()).unwrap();
        assert_eq!(vault.metadata("good.md").unwrap().slug(), Some("good"));
        assert!(vault.metadata("bad.md").is_none());

        // Served from the cache even after the file changes on disk.
        write_note(dir.path(), "good.md", "---\nslug: changed\n---\n");
        assert_eq!(vault.metadata("good.md").unwrap().slug(), Some("good"));
    }

    #[test]
    fn test_write_creates_parent_folders() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::open(dir.path(), &Config::default()).unwrap();
        vault.write("index/out.json", "{}").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("index/out.json")).unwrap(),
            "{}"
        );
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("notes/src.md", "other.md"), "notes/other.md");
        assert_eq!(join_relative("notes/src.md", "../ideas.md"), "ideas.md");
        assert_eq!(join_relative("notes/src.md", "./x/y.md"), "notes/x/y.md");
        assert_eq!(join_relative("notes/src.md", "/top.md"), "top.md");
        assert_eq!(join_relative("src.md", "a.md"), "a.md");
    }

    #[test]
    fn test_link_table_order() {
        let files: Vec<String> = ["a.md", "notes/a.md", "notes/deep/b.md", "x/c.md", "y/c.md"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let table = LinkTable::new(&files);

        // Source folder first.
        assert_eq!(table.find("a.md", "notes/src.md").as_deref(), Some("notes/a.md"));
        // Vault root next.
        assert_eq!(table.find("A.MD", "other/src.md").as_deref(), Some("a.md"));
        // Unique suffix.
        assert_eq!(table.find("b.md", "src.md").as_deref(), Some("notes/deep/b.md"));
        assert_eq!(table.find("DEEP/b.md", "src.md").as_deref(), Some("notes/deep/b.md"));
        assert_eq!(table.find("/deep/b.md", "src.md").as_deref(), Some("notes/deep/b.md"));
        // Ambiguous suffix defers to the caller.
        assert_eq!(table.find("c.md", "src.md"), None);
        // A partial segment is not a suffix match.
        assert_eq!(table.find("eep/b.md", "src.md"), None);
        // Extension-less text never matches a file name.
        assert_eq!(table.find("a", "src.md"), None);
    }

    #[test]
    fn test_link_lookup_reuses_walk() {
        let dir = tempfile::tempdir().unwrap();
        write_note(dir.path(), "x/c.md", "");
        write_note(dir.path(), "y/c.md", "");
        write_note(dir.path(), "notes/deep/b.md", "");

        let vault = FsVault::open(dir.path(), &Config::default()).unwrap();
        let first = vault.markdown_files().unwrap();
        assert!(Rc::ptr_eq(&first, &vault.markdown_files().unwrap()));

        assert_eq!(
            vault.resolve_link_path("deep/b.md", "src.md").as_deref(),
            Some("notes/deep/b.md")
        );
        assert_eq!(vault.resolve_link_path("c.md", "src.md"), None);
        assert_eq!(
            vault.resolve_link_path("c.md", "y/src.md").as_deref(),
            Some("y/c.md")
        );

        // The table is built from the first walk; later files are not seen.
        write_note(dir.path(), "late.md", "");
        assert_eq!(vault.resolve_link_path("late.md", "src.md"), None);
    }
}
