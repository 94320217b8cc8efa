use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use revdigest_core::{DigestConfig, DigestError, OutputFormat, StructureSource};
use revdigest_enrich::AnalyzerRegistry;
use revdigest_git::GitRepo;
use revdigest_report::{summarize, SummaryOptions, SummaryOutcome};

const CONFIG_FILE: &str = ".revdigest.toml";

#[derive(Parser)]
#[command(
    name = "revdigest",
    version,
    about = "Aggregate the changes between two git revisions into one review document",
    long_about = "revdigest collects the commits, per-file diffs and optional analyzer output\n\
                   between two revisions and renders them into a single Markdown document\n\
                   with a fixed, parseable layout.\n\n\
                   Examples:\n  \
                     revdigest summarize main feature/x          Write review_summary.md\n  \
                     revdigest summarize v1.0 HEAD -o out.md     Choose the output file\n  \
                     revdigest summarize main HEAD -l py,js      Only run Python/JS analyzers\n  \
                     revdigest doctor                            Check setup and analyzers"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .revdigest.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for command results
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text  Human-readable summaries (default)\n  \
                         json  Machine-readable JSON with camelCase keys\n\n\
                       The review document itself is always Markdown."
    )]
    format: OutputFormat,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Write a review document comparing two revisions
    #[command(long_about = "Write a review document comparing two revisions.\n\n\
        Both revisions may be branches, tags or commit ids. Commits reachable from\n\
        TARGET but not SOURCE are listed; diffs compare the two trees directly.\n\
        Analyzers (flake8, eslint, dart, dotnet, diffsitter, callgraph-gen,\n\
        metrics-cli) run when installed and are skipped otherwise.\n\n\
        Examples:\n  revdigest summarize main feature/login\n  \
        revdigest summarize main HEAD -c notes.md -t task.md --max-chars 8000")]
    Summarize {
        /// Source revision (e.g. main)
        source: String,

        /// Target revision (e.g. feature/xyz)
        target: String,

        /// Path inside the git repository (default: current directory)
        #[arg(short = 'r', long, default_value = ".")]
        repo_path: PathBuf,

        /// File whose contents open the document as context notes
        #[arg(short = 'c', long)]
        context_file: Option<PathBuf>,

        /// File whose contents are included as task instructions
        #[arg(short = 't', long)]
        task_file: Option<PathBuf>,

        /// Output Markdown file (default: review_summary.md)
        #[arg(short = 'o', long)]
        output_file: Option<PathBuf>,

        /// Comma-separated type tags to enrich (default: cs,py,js,dart)
        #[arg(short = 'l', long, value_delimiter = ',')]
        languages: Option<Vec<String>>,

        /// Maximum characters per diff chunk (default: 5000)
        #[arg(long)]
        max_chars: Option<usize>,

        /// Maximum concurrent analyzer processes (default: CPU count)
        #[arg(long)]
        jobs: Option<usize>,

        /// Seconds before an analyzer is killed (default: 60)
        #[arg(long)]
        timeout: Option<u64>,

        /// How to list project files
        #[arg(
            long,
            long_help = "How to list project files.\n\n\
                Sources:\n  \
                  tracked  Files in the git index (default)\n  \
                  walk     Working tree, honouring .gitignore"
        )]
        structure: Option<StructureSource>,
    },
    /// Create a default .revdigest.toml configuration file
    #[command(long_about = "Create a default .revdigest.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .revdigest.toml already exists.")]
    Init,
    /// Check your revdigest setup and analyzers
    #[command(long_about = "Check your revdigest setup and analyzers.\n\n\
        Reports repository discovery, the config file, and which analyzers are\n\
        installed. Use --format json for machine-readable output.")]
    Doctor {
        /// Path inside the git repository (default: current directory)
        #[arg(short = 'r', long, default_value = ".")]
        repo_path: PathBuf,
    },
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mrevdigest\x1b[0m v{version}: one document for every change between two revisions\n");

        println!("Quick start:");
        println!("  \x1b[36mrevdigest init\x1b[0m                     Create a .revdigest.toml config file");
        println!("  \x1b[36mrevdigest summarize main HEAD\x1b[0m      Summarize your branch into review_summary.md\n");

        println!("All commands:");
        println!("  \x1b[32msummarize\x1b[0m  Write a review document comparing two revisions");
        println!("  \x1b[32mdoctor\x1b[0m     Check your setup and installed analyzers");
        println!("  \x1b[32minit\x1b[0m       Create default configuration\n");
    } else {
        println!("revdigest v{version}: one document for every change between two revisions\n");

        println!("Quick start:");
        println!("  revdigest init                     Create a .revdigest.toml config file");
        println!("  revdigest summarize main HEAD      Summarize your branch into review_summary.md\n");

        println!("All commands:");
        println!("  summarize  Write a review document comparing two revisions");
        println!("  doctor     Check your setup and installed analyzers");
        println!("  init       Create default configuration\n");
    }

    println!("Run 'revdigest <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn load_config(path: Option<&Path>) -> Result<DigestConfig> {
    match path {
        Some(path) => Ok(DigestConfig::from_file(path)
            .wrap_err_with(|| format!("loading {}", path.display()))?),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                Ok(DigestConfig::from_file(default_path).wrap_err("loading .revdigest.toml")?)
            } else {
                Ok(DigestConfig::default())
            }
        }
    }
}

/// Read an optional preamble file, failing if it was named but is missing.
fn read_preamble(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.is_file() {
        return Err(DigestError::FileNotFound(path.to_path_buf()).into());
    }
    let text = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    Ok(Some(text))
}

fn print_outcome(outcome: &SummaryOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcome).into_diagnostic()?);
        }
        OutputFormat::Text => {
            let identity = &outcome.identity;
            match &identity.remote_name {
                Some(remote) => println!(
                    "Repository: {} ({}, remote {remote})",
                    identity.name,
                    identity.root.display()
                ),
                None => println!("Repository: {} ({})", identity.name, identity.root.display()),
            }
            if outcome.stat_summary.is_empty() {
                println!("No changes between the two revisions");
            } else {
                println!("{}", outcome.stat_summary);
            }
            println!(
                "{} commits, {} files, {} analyzer sections",
                outcome.commits, outcome.files_changed, outcome.enrichments
            );
            println!("Wrote {}", outcome.output.display());
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: String,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: impl Into<String>, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(
    config: &DigestConfig,
    repo_path: &Path,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Git repository
    match GitRepo::open(repo_path) {
        Ok(repo) => {
            let identity = repo.identity(&config.repository.remote);
            checks.push(CheckResult::pass(
                "git_repository",
                format!("detected at {}", identity.root.display()),
            ));
            match identity.remote_url {
                Some(url) => checks.push(CheckResult::info(
                    "remote",
                    format!("{} -> {url}", config.repository.remote),
                )),
                None => checks.push(CheckResult::info(
                    "remote",
                    format!("no '{}' remote configured", config.repository.remote),
                )),
            }
        }
        Err(err) => checks.push(CheckResult::fail(
            "git_repository",
            err.to_string(),
            "run revdigest from inside a git working tree or pass --repo-path",
        )),
    }

    // 2. Config file
    if Path::new(CONFIG_FILE).exists() {
        let analyzers = config.enrich.analyzers.len();
        let file_types = config.enrich.file_types.len();
        let detail = if analyzers + file_types > 0 {
            format!("{CONFIG_FILE} found ({analyzers} analyzers, {file_types} file types)")
        } else {
            format!("{CONFIG_FILE} found")
        };
        checks.push(CheckResult::pass("config_file", detail));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            format!("{CONFIG_FILE} not found"),
            "run 'revdigest init' to create a default config",
        ));
    }

    // 3. Enrichment settings
    checks.push(CheckResult::info(
        "languages",
        config.enrich.languages.join(", "),
    ));
    checks.push(CheckResult::info(
        "concurrency",
        format!(
            "{} jobs, {}s timeout",
            config.enrich.effective_jobs(),
            config.enrich.timeout_secs
        ),
    ));

    // 4. Analyzers
    let registry = AnalyzerRegistry::from_config(&config.enrich);
    for analyzer in registry.effective() {
        let name = format!("{}:{}", analyzer.kind(), analyzer.tag());
        if analyzer.is_available() {
            checks.push(CheckResult::pass(name, analyzer.label()));
        } else {
            checks.push(CheckResult::info(
                name,
                format!("{} (not installed, section skipped)", analyzer.label()),
            ));
        }
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Text => {
            let version = env!("CARGO_PKG_VERSION");
            println!("revdigest v{version}: environment check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<24} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# revdigest configuration
# Command-line flags override these values.

[report]
# Maximum characters per raw-diff chunk
# max_chars = 5000
# Unchanged lines of context around each hunk
# context_lines = 3
# Project structure source: "tracked" (git index) or "walk" (honours .gitignore)
# structure = "tracked"
# output = "review_summary.md"

[enrich]
# Type tags whose files are enriched
# languages = ["cs", "py", "js", "dart"]
# Seconds before an analyzer is killed
# timeout_secs = 60
# Concurrent analyzer processes (default: number of CPUs)
# jobs = 4

# Map extra extensions to type tags
# [[enrich.file_types]]
# extensions = ["ts", "tsx"]
# lint_tag = "ts"

# Add or replace analyzers. Entries here win over built-ins for the same
# kind and tag. Placeholders: {path} {file} {source} {target} {lang}
# [[enrich.analyzers]]
# kind = "lint"
# tag = "py"
# label = "Ruff warnings"
# program = "ruff"
# args = ["check", "{path}"]
# success_codes = [0, 1]

[repository]
# Remote used to derive the repository name
# remote = "origin"
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    tracing::debug!(
        format = %cli.format,
        analyzers = config.enrich.analyzers.len(),
        "loaded configuration"
    );

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Summarize {
            source,
            target,
            repo_path,
            context_file,
            task_file,
            output_file,
            languages,
            max_chars,
            jobs,
            timeout,
            structure,
        }) => {
            let context = read_preamble(context_file.as_deref())?;
            let task = read_preamble(task_file.as_deref())?;

            if let Some(languages) = languages {
                config.enrich.languages = languages;
            }
            if let Some(max_chars) = max_chars {
                config.report.max_chars = max_chars;
            }
            if let Some(jobs) = jobs {
                config.enrich.jobs = Some(jobs);
            }
            if let Some(timeout) = timeout {
                config.enrich.timeout_secs = timeout;
            }
            if let Some(structure) = structure {
                config.report.structure = structure;
            }
            config.validate()?;

            let output = output_file.unwrap_or_else(|| config.report.output.clone());
            let registry = AnalyzerRegistry::from_config(&config.enrich);
            let options = SummaryOptions {
                repo_path,
                source,
                target,
                context,
                task,
                output,
                config,
                show_progress: std::io::stderr().is_terminal()
                    && cli.format == OutputFormat::Text,
            };

            let outcome = summarize(&options, registry)
                .await
                .wrap_err_with(|| format!("summarizing {}..{}", options.source, options.target))?;
            print_outcome(&outcome, cli.format)?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor { repo_path }) => {
            run_doctor(&config, &repo_path, cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "revdigest", &mut std::io::stdout());
        }
    }

    Ok(())
}
