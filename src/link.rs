use regex::Regex;

use crate::error::Result;

const HOST_URI_PREFIX: &str = "obsidian://";

/// Recognizes the reference syntaxes notes use to point at each other.
pub struct LinkParser {
    wikilink: Regex,
    inline: Regex,
    absolute: Regex,
}

impl LinkParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            wikilink: Regex::new(r"^!?\[\[([^\]]*)\]\]$")?,
            inline: Regex::new(r"\[\[([^\]|#]*)(?:#[^\]|]*)?(?:\|[^\]]*)?\]\]")?,
            absolute: Regex::new(r"^(?:/?[A-Za-z]:[\\/]|/|~/)")?,
        })
    }

    /// Reduce a raw reference to the bare link text used for lookups.
    ///
    /// Wikilinks lose their brackets and any `#heading`, `#^block` or
    /// `|alias` suffix; host URIs yield their `file` parameter; a trailing
    /// `.md` is dropped. Returns `None` when nothing addressable is left.
    pub fn link_text(&self, raw: &str) -> Option<String> {
        let s = raw.trim();

        if let Some(path) = parse_host_uri(s) {
            return non_empty(strip_md_ext(&path));
        }

        if let Some(caps) = self.wikilink.captures(s) {
            let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let target = inner.split('|').next().unwrap_or_default();
            let target = target.split('#').next().unwrap_or_default();
            return non_empty(strip_md_ext(target.trim()));
        }

        non_empty(strip_md_ext(s.trim_start_matches('!')))
    }

    pub fn is_absolute(&self, text: &str) -> bool {
        self.absolute.is_match(text)
    }

    /// Distinct wikilink targets in a block of text, in order of appearance.
    pub fn inline_targets(&self, text: &str) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for caps in self.inline.captures_iter(text) {
            let target = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            if !target.is_empty() && !targets.iter().any(|t| t == target) {
                targets.push(target.to_string());
            }
        }
        targets
    }

    pub fn has_wikilink(&self, text: &str) -> bool {
        self.inline.is_match(text)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// `obsidian://open?vault=Name&file=Folder%2FNote` → `Folder/Note`.
pub fn parse_host_uri(s: &str) -> Option<String> {
    let rest = s.strip_prefix(HOST_URI_PREFIX)?;
    let (_, query) = rest.split_once('?')?;
    let value = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("file="))?;
    let decoded = urlencoding::decode(value).ok()?;
    let path = decoded.trim_start_matches('/').to_string();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

pub fn strip_md_ext(path: &str) -> &str {
    let len = path.len();
    if len >= 3 && path.is_char_boundary(len - 3) && path[len - 3..].eq_ignore_ascii_case(".md") {
        &path[..len - 3]
    } else {
        path
    }
}

/// Last path segment without its extension; accepts `/` and `\` separators.
pub fn basename_no_ext(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

/// Vault path with the file extension removed (`notes/a.md` → `notes/a`).
pub fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(i) if i > 0 => &path[..name_start + i],
        _ => path,
    }
}
