use serde_json::{Map, Value};

/// Keys the host injects into cached frontmatter; never copied into records.
const POSITION_KEY: &str = "position";

/// Parsed frontmatter of one note.
///
/// The raw map is kept as-is for record output. The fields the indexer
/// relies on for arbitration and resolution are normalized once here so callers never re-check YAML shapes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    fields: Map<String, Value>,
    slug: Option<String>,
    title: Option<String>,
    inherits: Option<Vec<Value>>,
}

impl Frontmatter {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let slug = fields
            .get("slug")
            .and_then(scalar_string)
            .filter(|s| !s.is_empty());
        let title = fields
            .get("title")
            .and_then(scalar_string)
            .filter(|s| !s.is_empty());
        let inherits = match fields.get("inherits") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(items.iter().map(unnest_wikilink).collect()),
            Some(other) => Some(vec![unnest_wikilink(other)]),
        };

        Self {
            fields,
            slug,
            title,
            inherits,
        }
    }

    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// `None` when the key is absent or null, otherwise the entries as written.
    pub fn inherits(&self) -> Option<&[Value]> {
        self.inherits.as_deref()
    }

    /// All fields except the host's position bookkeeping.
    pub fn record_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().filter(|(k, _)| k.as_str() != POSITION_KEY)
    }
}

pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// An unquoted `[[note]]` in YAML parses as a nested single-item list.
fn unnest_wikilink(value: &Value) -> Value {
    if let Value::Array(outer) = value {
        if let [Value::Array(inner)] = outer.as_slice() {
            if let [Value::String(target)] = inner.as_slice() {
                return Value::String(format!("[[{}]]", target));
            }
        }
    }
    value.clone()
}

/// Split a note into its raw YAML header and the body that follows.
///
/// Returns `None` when the note does not open with a `---` line or the
/// header is never closed by `---` or `...`.
pub fn split_frontmatter(input: &str) -> Option<(&str, &str)> {
    let text = input.strip_prefix('\u{feff}').unwrap_or(input);
    let first_end = text.find('\n')?;
    if text[..first_end].trim_end() != "---" {
        return None;
    }

    let yaml_start = first_end + 1;
    let mut pos = yaml_start;
    while pos <= text.len() {
        let line_end = text[pos..].find('\n').map(|i| pos + i).unwrap_or(text.len());
        let line = text[pos..line_end].trim_end();
        if line == "---" || line == "..." {
            let body_start = (line_end + 1).min(text.len());
            return Some((&text[yaml_start..pos], &text[body_start..]));
        }
        if line_end == text.len() {
            break;
        }
        pos = line_end + 1;
    }
    None
}

/// Parse the frontmatter block of a note.
///
/// `Ok(None)` means the note has no (or an empty) header; malformed YAML
/// is reported as an error so the caller can decide how loudly to skip it.
pub fn extract_frontmatter(input: &str) -> Result<Option<Frontmatter>, serde_yaml::Error> {
    let Some((yaml, _)) = split_frontmatter(input) else {
        return Ok(None);
    };
    if yaml.trim().is_empty() {
        return Ok(None);
    }

    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Object(map) => Ok(Some(Frontmatter::from_fields(map))),
        _ => Ok(None),
    }
}

/// Everything after the frontmatter, or the whole note when it has none.
pub fn body(input: &str) -> &str {
    split_frontmatter(input)
        .map(|(_, body)| body)
        .unwrap_or(input)
}
