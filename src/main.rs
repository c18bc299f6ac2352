use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Instant;

use vaultdex::config::{load_config, Config};
use vaultdex::corpus::{load_corpus, LOCAL_RANK};
use vaultdex::expand::Expander;
use vaultdex::index::{build_index, load_index};
use vaultdex::render::{format_timestamp, write_outputs};
use vaultdex::resolve::Resolver;
use vaultdex::vault::{FsVault, Vault};
use vaultdex::{Result, VaultError};

/// vaultdex - Slug index builder for Markdown vaults
#[derive(Parser)]
#[command(name = "vaultdex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (looked up in the vault root when not found here)
    #[arg(short, long, global = true, default_value = ".vaultdex.toml")]
    config: PathBuf,

    /// Vault root
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the slug index and the readable index note
    Build {
        /// Fail without writing if any inherits link does not resolve
        #[arg(long)]
        strict: bool,
    },

    /// Report overrides and unresolved links without writing anything
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which note a reference resolves to
    Resolve {
        /// Reference as written: [[link]], path, absolute path or obsidian:// URI
        token: String,

        /// Vault-relative path of the note containing the reference
        #[arg(short, long, default_value = "")]
        from: String,
    },

    /// Print one record from the written index
    Show {
        /// Slug to look up
        slug: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace paragraphs containing wikilinks with the linked notes' bodies
    Expand {
        /// Input note (vault-relative)
        #[arg(short, long)]
        input: Option<String>,

        /// Output note (vault-relative)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", default_level))
        .init();

    let result = run(&cli);

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but found something to report.
fn run(cli: &Cli) -> Result<bool> {
    let config_path = if cli.config.is_relative() && !cli.config.exists() {
        cli.root.join(&cli.config)
    } else {
        cli.config.clone()
    };
    let config = load_config(&config_path)?;
    let vault = FsVault::open(&cli.root, &config)?;

    match &cli.command {
        Commands::Build { strict } => {
            cmd_build(&vault, &config, *strict || config.strict, cli.quiet).map(|_| true)
        }
        Commands::Check { json } => cmd_check(&vault, &config, *json),
        Commands::Resolve { token, from } => cmd_resolve(&vault, &config, token, from),
        Commands::Show { slug, json } => cmd_show(&vault, &config, slug, *json).map(|_| true),
        Commands::Expand { input, output } => {
            let input = input.as_deref().unwrap_or(&config.expand.input);
            let output = output.as_deref().unwrap_or(&config.expand.output);
            cmd_expand(&vault, &config, input, output, cli.quiet).map(|_| true)
        }
    }
}

fn cmd_build(vault: &FsVault, config: &Config, strict: bool, quiet: bool) -> Result<()> {
    let start = Instant::now();

    if !quiet {
        println!("{} {}", "Indexing".cyan().bold(), vault.root().display());
    }

    let corpus = load_corpus(vault, &config.remote_roots)?;
    let output = build_index(vault, &corpus, strict)?;
    write_outputs(vault, &output, &config.output)?;

    if !quiet {
        println!(
            "Indexed {} notes (local overrides applied) → {}",
            output.index.len().to_string().green().bold(),
            config.output.index_json.cyan()
        );
        println!();
        println!("{}", "Index Statistics".green().bold());
        println!("  Notes scanned:    {}", corpus.len().to_string().cyan());
        println!("  Slugs declared:   {}", output.candidates.to_string().cyan());
        println!("  Overrides:        {}", output.overrides.len().to_string().cyan());
        println!("  Problems:         {}", problem_count(output.problems.len()));
        println!("  Time elapsed:     {:.2?}", start.elapsed());
        println!();
        println!(
            "{} {}",
            "Readable index written to".green(),
            config.output.index_note.cyan()
        );
    }

    Ok(())
}

fn cmd_check(vault: &FsVault, config: &Config, json: bool) -> Result<bool> {
    let corpus = load_corpus(vault, &config.remote_roots)?;
    let output = build_index(vault, &corpus, false)?;

    if json {
        let report = serde_json::json!({
            "indexed": output.index.len(),
            "overrides": output.overrides,
            "problems": output.problems,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(output.problems.is_empty());
    }

    println!(
        "{} slugs from {} notes",
        output.index.len().to_string().green().bold(),
        corpus.len()
    );

    if !output.overrides.is_empty() {
        println!();
        println!("{}", "Overrides (local → remote)".yellow().bold());
        for line in &output.overrides {
            println!("  {}", line);
        }
    }

    if output.problems.is_empty() {
        println!("{}", "No unresolved links.".green());
    } else {
        println!();
        println!("{}", "Unresolved / Notes".red().bold());
        for line in &output.problems {
            println!("  {}", line);
        }
    }

    Ok(output.problems.is_empty())
}

fn cmd_resolve(vault: &FsVault, config: &Config, token: &str, from: &str) -> Result<bool> {
    let corpus = load_corpus(vault, &config.remote_roots)?;
    let resolver = Resolver::new(vault, &corpus)?;

    let Some(resolution) = resolver.resolve(token, from) else {
        println!("{} {}", "Unresolved:".yellow().bold(), token);
        return Ok(false);
    };

    let document = resolution.document;
    let origin = if document.rank == LOCAL_RANK { "local" } else { "remote" };
    println!("{}", document.path.cyan());
    println!("  {} {}", "via".dimmed(), resolution.step);
    println!("  {} {}", "origin".dimmed(), origin);
    if let Some(fm) = vault.metadata(&document.path) {
        if let Some(slug) = fm.slug() {
            println!("  {} {}", "slug".dimmed(), slug);
        }
        if let Some(title) = fm.title() {
            println!("  {} {}", "title".dimmed(), title);
        }
    }
    Ok(true)
}

fn cmd_show(vault: &FsVault, config: &Config, slug: &str, json: bool) -> Result<()> {
    let index_path = vault.absolute_path(&config.output.index_json);
    let index = load_index(&index_path)?;
    let record = index
        .get(slug)
        .ok_or_else(|| VaultError::UnknownSlug(slug.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!("{} {}", record.heading().green().bold(), format!("({})", record.slug).dimmed());
    println!("  Source:   [[{}]]", record.vaultlink);
    println!("  Absolute: {}", record.file);
    if let Some(label) = record.label() {
        println!("  Label:    {}", label);
    }
    println!("  Updated:  {}", format_timestamp(record.mtime));
    if let Some(inherits) = record.inherits.as_ref().filter(|i| !i.is_empty()) {
        println!("  Inherits: {}", inherits.join(", ").cyan());
    }
    Ok(())
}

fn cmd_expand(
    vault: &FsVault,
    config: &Config,
    input: &str,
    output: &str,
    quiet: bool,
) -> Result<()> {
    let corpus = load_corpus(vault, &config.remote_roots)?;
    let expander = Expander::new(vault, &corpus, &config.extensions)?;
    let report = expander.expand_note(input, output)?;

    if !quiet {
        println!(
            "Expanded {} of {} paragraphs from {} → {}",
            report.expanded.to_string().green().bold(),
            report.paragraphs,
            report.input.cyan(),
            report.output.cyan()
        );
    }
    Ok(())
}

fn problem_count(count: usize) -> colored::ColoredString {
    if count == 0 {
        "0".green()
    } else {
        count.to_string().red()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_note(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn run_args(root: &Path, args: &[&str]) -> Result<bool> {
        let mut argv = vec!["vaultdex", "--quiet", "--root", root.to_str().unwrap()];
        argv.extend_from_slice(args);
        run(&Cli::try_parse_from(argv).unwrap())
    }

    fn sample_vault() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_note(dir.path(), "common/a.md", "---\nslug: alpha\n---\n");
        write_note(dir.path(), "local/a.md", "---\nslug: alpha\ntitle: Alpha\n---\n");
        write_note(
            dir.path(),
            "roles/b.md",
            "---\nslug: beta\ninherits: [\"[[local/a]]\", \"[[missing-note]]\"]\n---\n",
        );
        dir
    }

    #[test]
    fn test_check_reports_problems_without_writing() {
        let dir = sample_vault();
        assert!(!run_args(dir.path(), &["check"]).unwrap());
        assert!(!run_args(dir.path(), &["check", "--json"]).unwrap());
        assert!(!dir.path().join("index").exists());

        let clean = tempfile::tempdir().unwrap();
        write_note(clean.path(), "a.md", "---\nslug: a\n---\n");
        assert!(run_args(clean.path(), &["check"]).unwrap());
    }

    #[test]
    fn test_build_writes_outputs_and_strict_refuses() {
        let dir = sample_vault();
        assert!(matches!(
            run_args(dir.path(), &["build", "--strict"]),
            Err(VaultError::Validation { .. })
        ));
        assert!(!dir.path().join("index").exists());

        assert!(run_args(dir.path(), &["build"]).unwrap());
        assert!(dir.path().join("index/instructions_index.json").is_file());
        assert!(dir.path().join("index/Instructions Index.md").is_file());
    }

    #[test]
    fn test_resolve_exit_status() {
        let dir = sample_vault();
        assert!(run_args(dir.path(), &["resolve", "[[a]]", "--from", "roles/b.md"]).unwrap());
        assert!(!run_args(dir.path(), &["resolve", "[[missing-note]]"]).unwrap());
    }

    #[test]
    fn test_show_needs_index_and_known_slug() {
        let dir = sample_vault();
        assert!(matches!(
            run_args(dir.path(), &["show", "alpha"]),
            Err(VaultError::IndexNotFound(_))
        ));

        run_args(dir.path(), &["build"]).unwrap();
        assert!(run_args(dir.path(), &["show", "alpha"]).unwrap());
        assert!(run_args(dir.path(), &["show", "beta", "--json"]).unwrap());
        assert!(matches!(
            run_args(dir.path(), &["show", "nope"]),
            Err(VaultError::UnknownSlug(slug)) if slug == "nope"
        ));
    }

    #[test]
    fn test_config_is_read_from_vault_root() {
        let dir = sample_vault();
        fs::write(
            dir.path().join(".vaultdex.toml"),
            "[output]\nindex_json = \"out/idx.json\"\n",
        )
        .unwrap();
        run_args(dir.path(), &["build"]).unwrap();
        assert!(dir.path().join("out/idx.json").is_file());
    }
}
