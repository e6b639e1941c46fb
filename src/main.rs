use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use linenote_core::{LinenoteConfig, OutputFormat, Policy, PullRequest};
use linenote_review::github::{self, GitHubClient};
use linenote_review::pipeline::{CommentPipeline, RunReport};

const CONFIG_FILE: &str = ".linenote.toml";

#[derive(Parser)]
#[command(
    name = "linenote",
    version,
    about = "Post analyzer suggestions on pull request lines",
    long_about = "linenote reads the files a pull request changes, asks an analyzer which line\n\
                   deserves a comment, and posts a suggestion there. When GitHub refuses an\n\
                   inline comment because the line is outside the diff, the suggestion is\n\
                   posted on the pull request instead.\n\n\
                   Examples:\n  \
                     linenote run --pr owner/repo#12             Comment on every changed file\n  \
                     linenote run --pr owner/repo#12 src/a.py    Comment on selected files\n  \
                     git diff --name-only main | linenote run --pr owner/repo#12 --files-from -\n  \
                     linenote run --policy header                Inside a pull_request workflow\n  \
                     linenote init                               Write a default .linenote.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .linenote.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for the run report
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for the run report.\n\n\
                       Formats:\n  \
                         text      Human-readable summary (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown, e.g. for $GITHUB_STEP_SUMMARY"
    )]
    format: OutputFormat,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze changed files and post suggestions to a pull request
    #[command(long_about = "Analyze changed files and post suggestions to a pull request.\n\n\
        Files come from the positional arguments, --files-from, or, when neither is\n\
        given, the pull request's own file list. Requires GITHUB_TOKEN or GH_TOKEN.\n\n\
        Examples:\n  linenote run --pr owner/repo#12\n  linenote run --pr owner/repo#12 --head-sha abc123 app.py")]
    Run {
        /// Pull request (format: owner/repo#123)
        #[arg(
            long,
            long_help = "Pull request to comment on.\n\nFormat: owner/repo#123\n\
                Defaults to GITHUB_REPOSITORY and GITHUB_REF inside a pull_request workflow."
        )]
        pr: Option<String>,
        /// Head commit to read files at and anchor comments to (default: fetched)
        #[arg(long)]
        head_sha: Option<String>,
        /// Suggestion policy: analyzer or header (default: from config)
        #[arg(long)]
        policy: Option<Policy>,
        /// Read newline-separated file paths from a file, or `-` for stdin
        #[arg(long)]
        files_from: Option<PathBuf>,
        /// Changed files to comment on
        files: Vec<String>,
    },
    /// Create a default .linenote.toml in the current directory
    Init,
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r##"# linenote configuration

[analyzer]
# "analyzer" runs the command below; "header" proposes [header].sentinel as line 1
policy = "analyzer"
# The file text is written to stdin. The program prints either
# {"line": 3, "comment": "..."} or a JSON array of such objects.
command = "python3"
args = [".github/scripts/analyze.py"]
# Larger stdout fails the file
max_output_bytes = 1048576

[header]
sentinel = "# -*- coding: utf-8 -*-"

[comments]
# Prefixed to every analyzer comment line
marker = "#"
# "suggestion" posts a GitHub suggestion block; "preview" posts the whole file
style = "suggestion"
# "unprocessable-only" re-posts as an issue comment only when GitHub rejects the
# line as outside the diff (HTTP 422); "always" does so on any failure
fallback = "unprocessable-only"
# skip_patterns = ["vendor/**", "*.lock"]
"##;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<LinenoteConfig> {
    match path {
        Some(path) => Ok(LinenoteConfig::from_file(path)?),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                Ok(LinenoteConfig::from_file(default_path)?)
            } else {
                Ok(LinenoteConfig::default())
            }
        }
    }
}

fn read_file_list(files_from: Option<&Path>, mut files: Vec<String>) -> Result<Vec<String>> {
    let Some(path) = files_from else {
        return Ok(files);
    };
    let input = if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .into_diagnostic()
            .wrap_err("reading file list from stdin")?;
        input
    } else {
        std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display()))?
    };
    files.extend(
        input
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from),
    );
    Ok(files)
}

fn resolve_pr_reference(pr: Option<&str>) -> Result<String> {
    if let Some(pr) = pr {
        return Ok(pr.to_string());
    }
    let repository = std::env::var("GITHUB_REPOSITORY").unwrap_or_default();
    let git_ref = std::env::var("GITHUB_REF").unwrap_or_default();
    github::pr_reference_from_actions(&repository, &git_ref).ok_or_else(|| {
        miette::miette!(
            help = "Pass --pr owner/repo#123, or run inside a pull_request workflow",
            "No pull request given"
        )
    })
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).into_diagnostic()?);
        }
        OutputFormat::Markdown => print!("{}", report.to_markdown()),
        OutputFormat::Text => print!("{report}"),
    }
    Ok(())
}

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

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
        }
        Some(Command::Run {
            ref pr,
            ref head_sha,
            policy,
            ref files_from,
            ref files,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let files = read_file_list(files_from.as_deref(), files.clone())?;

            let pr_ref = resolve_pr_reference(pr.as_deref())?;
            let (owner, repo, number) = github::parse_pr_reference(&pr_ref)?;
            let client = GitHubClient::new(None)?;
            let head_sha = match head_sha {
                Some(sha) => sha.clone(),
                None => client.head_sha(&owner, &repo, number).await?,
            };
            let pr = PullRequest {
                owner,
                repo,
                number,
                head_sha,
            };

            let policy = policy.unwrap_or(config.analyzer.policy);
            tracing::info!(%pr, %policy, head = %pr.head_sha, "starting run");
            let analyzer = linenote_review::analyzer::from_config(&config, policy);
            let pipeline = CommentPipeline::new(&client, analyzer.as_ref(), &config.comments)?;

            let report = if files.is_empty() {
                pipeline.run_changed(&pr).await?
            } else {
                pipeline.run(&pr, &files).await?
            };
            print_report(&report, cli.format)?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "linenote", &mut std::io::stdout());
        }
    }

    Ok(())
}
