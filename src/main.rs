use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use git_patchwork::controller::{Common, StagingController};
use git_patchwork::os::{CommandClipboard, CommandEditor};
use git_patchwork::session::{Session, TerminalUi};
use git_patchwork::{Config, GitCli, Patch, PatchworkError, logging};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "git-patchwork")]
#[command(about = "Line-level staging and cross-commit patch building for git")]
#[command(version)]
struct Cli {
    /// Repository to work in
    #[arg(short = 'C', long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Configuration file (default: <config dir>/git-patchwork/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log git commands and other details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage or unstage individual lines of a file
    Stage {
        file: String,
        /// Stage rows N or N..M of the unstaged diff (as numbered by `show`)
        /// instead of starting an interactive session
        #[arg(long)]
        lines: Option<String>,
        /// With --lines, unstage rows of the staged diff instead
        #[arg(long, requires = "lines")]
        staged: bool,
    },
    /// Build a custom patch from lines a commit changed in a file
    Patch { commit: String, file: String },
    /// Print a file's diff with the row number of every line
    Show {
        file: String,
        /// Show the staged diff
        #[arg(long, conflicts_with = "commit")]
        staged: bool,
        /// Show what this commit did to the file
        #[arg(long)]
        commit: Option<String>,
    },
    /// Generate shell completions
    Completions { shell: Shell },
    /// Generate a man page
    Man,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PatchworkError> {
    match cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "git-patchwork", &mut io::stdout());
            return Ok(());
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut io::stdout())?;
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(cli.config.as_deref())?;
    let git = GitCli::new(&cli.repo).with_context_lines(config.git.context_lines);
    let editor = CommandEditor::new(&config.os, &cli.repo);
    let clipboard = CommandClipboard::new(&config.os);
    let term = TerminalUi::new(io::stdin().lock(), io::stdout());
    let common = Common {
        git: &git,
        editor: &editor,
        clipboard: &clipboard,
        ui: &term,
        config: &config,
    };

    match cli.command {
        Commands::Stage {
            file,
            lines: Some(range),
            staged,
        } => stage_rows(&common, &file, &range, staged),
        Commands::Stage { file, .. } => Session::staging(common, &term, &file)?.run(),
        Commands::Patch { commit, file } => {
            let commit = git.resolve_commit(&commit)?;
            Session::patch_building(common, &term, commit, &file)?.run()
        }
        Commands::Show {
            file,
            staged,
            commit,
        } => {
            let diff = match commit {
                Some(rev) => git.commit_diff(&git.resolve_commit(&rev)?.id, &file)?,
                None => git.diff_file(&file, staged)?,
            };
            show(&Patch::parse_bytes(&diff), io::stdout().lock())
        }
        Commands::Completions { .. } | Commands::Man => Ok(()),
    }
}

/// Stage (or unstage) a row range without a session.
fn stage_rows(
    common: &Common<'_>,
    file: &str,
    range: &str,
    staged: bool,
) -> Result<(), PatchworkError> {
    let (first, last) = parse_range(range)?;
    let controller = StagingController::new(file, staged);
    if !controller.refresh(common)? {
        return Err(PatchworkError::NoChanges {
            file: file.to_string(),
        });
    }

    if let Some(explorer) = controller.context().lock().as_mut() {
        explorer.select_line(first);
        explorer.toggle_range();
        explorer.select_line(last);
    }
    controller.toggle_staged(common)
}

fn parse_range(range: &str) -> Result<(usize, usize), PatchworkError> {
    let invalid = || PatchworkError::InvalidRange {
        range: range.to_string(),
    };
    let (a, b) = range.split_once("..").unwrap_or((range, range));
    let a = a.trim().parse().map_err(|_| invalid())?;
    let b = b.trim().parse().map_err(|_| invalid())?;
    Ok((a, b))
}

/// Print every row of the diff with its row number.
fn show(patch: &Patch, mut out: impl Write) -> Result<(), PatchworkError> {
    for (row, line) in patch.format_plain().lines().enumerate() {
        writeln!(out, "{row:>4} {line}")?;
    }
    Ok(())
}
