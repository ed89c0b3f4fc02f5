use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use gitlet::areas::repository::Repository;
use gitlet::errors::find_repository_error;
use is_terminal::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV_VAR: &str = "GITLET_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

/// Exit code for failures that are not a recoverable repository error
const UNEXPECTED_FAILURE_EXIT_CODE: u8 = 2;

#[derive(Parser)]
#[command(
    name = "gitlet",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A minimal local version-control system",
    long_about = "Gitlet tracks snapshots of a working directory as an immutable, \
    content-addressed commit graph, with branches, three-way merges \
    and checkout of any earlier snapshot.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command initializes a new repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
    },
    #[command(name = "add", about = "Stage files for the next commit")]
    Add {
        #[arg(index = 1, required = true, help = "Files or directories to stage")]
        paths: Vec<String>,
    },
    #[command(
        name = "rm",
        about = "Unstage a file or stage it for removal",
        long_about = "This command unstages a file staged for addition, or, if the file is \
        tracked by the current commit, stages it for removal and deletes it from the working directory."
    )]
    Rm {
        #[arg(index = 1)]
        path: String,
    },
    #[command(name = "commit", about = "Create a new commit with the specified message")]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(name = "log", about = "Show first-parent history from HEAD")]
    Log,
    #[command(name = "global-log", about = "Show every commit ever made")]
    GlobalLog,
    #[command(name = "find", about = "Print the ids of commits with the given message")]
    Find {
        #[arg(index = 1)]
        message: String,
    },
    #[command(name = "status", about = "Show branches, staged files and working tree changes")]
    Status,
    #[command(name = "branch", about = "Create a branch at the current commit")]
    Branch {
        #[arg(index = 1)]
        name: String,
    },
    #[command(name = "rm-branch", about = "Delete a branch")]
    RmBranch {
        #[arg(index = 1)]
        name: String,
    },
    #[command(
        name = "checkout",
        about = "Switch branches or restore working files",
        long_about = "checkout <branch>           switch to a branch\n\
        checkout <commit>           detach HEAD at a commit\n\
        checkout -- <file>          restore a file from HEAD\n\
        checkout <commit> -- <file> restore a file from a commit"
    )]
    #[command(group(ArgGroup::new("checkout_target").required(true).multiple(true).args(["target", "file"])))]
    Checkout {
        #[arg(index = 1, help = "Branch name or commit id")]
        target: Option<String>,
        #[arg(index = 2, last = true, help = "File to restore")]
        file: Option<String>,
    },
    #[command(name = "reset", about = "Check out a commit and move the current branch to it")]
    Reset {
        #[arg(index = 1)]
        commit: String,
    },
    #[command(name = "merge", about = "Merge a branch into the current branch")]
    Merge {
        #[arg(index = 1)]
        branch: String,
    },
    #[command(
        name = "cat-file",
        about = "Print the content of an object",
        long_about = "This command prints the content of an object in the repository. \
        It requires the SHA of the object to be specified."
    )]
    CatFile {
        #[arg(short = 'p', long, help = "The object SHA to print")]
        sha: String,
    },
    #[command(
        name = "hash-object",
        about = "Hash a file and optionally write it to the object database"
    )]
    HashObject {
        #[arg(short, long, required = false, help = "Write the object to the object database")]
        write: bool,
        #[arg(index = 1)]
        file: String,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn init_colors() {
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}

fn run(command: Commands, pwd: PathBuf) -> Result<()> {
    let repository = || Repository::open(&pwd, Box::new(std::io::stdout()));

    match command {
        Commands::Init { path } => {
            let path = path.map(PathBuf::from).unwrap_or_else(|| pwd.clone());
            Repository::new(&path, Box::new(std::io::stdout()))?.init()?;
        }
        Commands::Add { paths } => repository()?.add(&paths)?,
        Commands::Rm { path } => repository()?.rm(&path)?,
        Commands::Commit { message } => {
            repository()?.commit(&message)?;
        }
        Commands::Log => repository()?.log()?,
        Commands::GlobalLog => repository()?.global_log()?,
        Commands::Find { message } => repository()?.find(&message)?,
        Commands::Status => {
            repository()?.status()?;
        }
        Commands::Branch { name } => {
            repository()?.branch(&name)?;
        }
        Commands::RmBranch { name } => {
            repository()?.rm_branch(&name)?;
        }
        Commands::Checkout { target, file } => match (target, file) {
            (Some(target), None) => repository()?.checkout(&target)?,
            (None, Some(file)) => repository()?.checkout_file(&file)?,
            (Some(target), Some(file)) => repository()?.checkout_commit_file(&target, &file)?,
            (None, None) => anyhow::bail!("checkout needs a branch, a commit or a file"),
        },
        Commands::Reset { commit } => repository()?.reset(&commit)?,
        Commands::Merge { branch } => {
            repository()?.merge(&branch)?;
        }
        Commands::CatFile { sha } => repository()?.cat_file(&sha)?,
        Commands::HashObject { write, file } => {
            repository()?.hash_object(&file, write)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing();
    init_colors();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|pwd| run(cli.command, pwd));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => match find_repository_error(&error) {
            Some(repository_error) => {
                eprintln!("{repository_error}");
                ExitCode::from(repository_error.exit_code() as u8)
            }
            None => {
                eprintln!("error: {error:#}");
                ExitCode::from(UNEXPECTED_FAILURE_EXIT_CODE)
            }
        },
    }
}
