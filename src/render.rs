use chrono::{TimeZone, Utc};

use crate::config::OutputConfig;
use crate::error::Result;
use crate::index::{BuildOutput, IndexRecord};
use crate::vault::Vault;

/// Render the human-readable index note, one section per slug in slug order.
pub fn render_note(output: &BuildOutput, title: &str) -> String {
    let mut lines: Vec<String> = vec![format!("# {}", title), String::new()];

    // BTreeMap iteration is already lexicographic by slug.
    for record in output.index.values() {
        push_record(&mut lines, record);
    }

    if !output.overrides.is_empty() || !output.problems.is_empty() {
        lines.push("---".to_string());
        if !output.overrides.is_empty() {
            lines.push("**Overrides (local → remote):**".to_string());
            lines.extend(output.overrides.iter().map(|s| format!("- {}", s)));
            lines.push(String::new());
        }
        if !output.problems.is_empty() {
            lines.push("**Unresolved / Notes:**".to_string());
            lines.extend(output.problems.iter().map(|s| format!("- {}", s)));
            lines.push(String::new());
        }
    }

    let mut note = lines.join("\n").trim_end_matches('\n').to_string();
    note.push('\n');
    note
}

fn push_record(lines: &mut Vec<String>, record: &IndexRecord) {
    lines.push(format!("## {}", record.heading()));
    lines.push("Slugline:".to_string());
    lines.push(String::new());
    lines.push("```text".to_string());
    lines.push(record.slug.clone());
    lines.push("```".to_string());
    if !record.vaultlink.is_empty() {
        lines.push(format!("- Source: [[{}]]", record.vaultlink));
    }
    lines.push(format!("- Absolute: `{}`", record.file));
    if let Some(label) = record.label() {
        lines.push(format!("- Label: `{}`", label));
    }
    if let Some(title) = record.title() {
        lines.push(format!("- Frontmatter Title: {}", title));
    }
    if record.mtime > 0 {
        lines.push(format!("- Updated: {}", format_timestamp(record.mtime)));
    }
    if let Some(inherits) = record.inherits.as_ref().filter(|i| !i.is_empty()) {
        lines.push("- Inherits (slugs):".to_string());
        lines.extend(inherits.iter().map(|s| format!("  - {}", s)));
    }
    lines.push(String::new());
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_timestamp(secs: i64) -> String {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Overwrite the JSON index, then the readable note.
///
/// The writes are independent: a failure on the note leaves the JSON in place.
pub fn write_outputs(vault: &dyn Vault, output: &BuildOutput, config: &OutputConfig) -> Result<()> {
    let json = output.to_json()?;
    vault.write(&config.index_json, &json)?;
    log::info!("wrote {}", config.index_json);

    let note = render_note(output, &config.note_title);
    vault.write(&config.index_note, &note)?;
    log::info!("wrote {}", config.index_note);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::load_corpus;
    use crate::index::build_index;
    use crate::vault::memory::MemoryVault;

    fn sample() -> (MemoryVault, BuildOutput) {
        let vault = MemoryVault::new(&[
            ("common/a.md", "---\nslug: alpha\n---\n"),
            (
                "local/a.md",
                "---\nslug: alpha\ntitle: Alpha Role\nlabel: ALPHA\n---\n",
            ),
            (
                "roles/zeta.md",
                "---\nslug: zeta\ninherits: [\"[[local/a]]\", \"[[missing-note]]\"]\n---\n",
            ),
        ]);
        let corpus = load_corpus(&vault, &["common".to_string()]).unwrap();
        let out = build_index(&vault, &corpus, false).unwrap();
        (vault, out)
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_render_note_layout() {
        let (_, out) = sample();
        let note = render_note(&out, "Instructions Index");
        let expected = "\
# Instructions Index

## Alpha Role
Slugline:

```text
alpha
```
- Source: [[local/a]]
- Absolute: `/vault/local/a.md`
- Label: `ALPHA`
- Frontmatter Title: Alpha Role
- Updated: 2023-11-14 22:13:21

## zeta
Slugline:

```text
zeta
```
- Source: [[roles/zeta]]
- Absolute: `/vault/roles/zeta.md`
- Updated: 2023-11-14 22:13:22
- Inherits (slugs):
  - alpha

---
**Overrides (local → remote):**
- alpha: local/a.md overrides common/a.md

**Unresolved / Notes:**
- Unresolved inherits link in roles/zeta.md: \"[[missing-note]]\"
";
        assert_eq!(note, expected);
    }

    #[test]
    fn test_render_without_footer() {
        let vault = MemoryVault::new(&[("b.md", "---\nslug: b\n---\n")]);
        let corpus = load_corpus(&vault, &[]).unwrap();
        let out = build_index(&vault, &corpus, false).unwrap();
        let note = render_note(&out, "Index");
        assert!(!note.contains("---\n**"));
        assert!(note.ends_with("- Updated: 2023-11-14 22:13:20\n"));
    }

    #[test]
    fn test_write_outputs() {
        let (vault, out) = sample();
        let config = OutputConfig::default();
        write_outputs(&vault, &out, &config).unwrap();

        let written = vault.written.borrow();
        let json = &written["index/instructions_index.json"];
        assert!(json.starts_with("{\n  \"alpha\": {\n    \"slug\": \"alpha\""));
        assert!(written["index/Instructions Index.md"].starts_with("# Instructions Index\n"));
    }
}
