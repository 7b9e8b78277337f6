use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "modscope")]
#[command(about = "Module introspection for multi-repository workspaces")]
#[command(version)]
struct Cli {
    /// Path to the workspace root (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the config file (defaults to .modscope/config.toml in the workspace)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the modules of the workspace
    List {
        /// Scan imports and compare them with each manifest
        #[arg(long)]
        with_imports: bool,

        /// Only modules of this type (repeatable)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
    },

    /// Show imports, dependency findings and git status of one module
    Info {
        /// Module name
        name: String,
    },

    /// Scaffold a new module
    Create {
        /// snake_case module name
        name: String,

        /// Module type (core, manager, util, plugin, mcp)
        #[arg(short = 't', long = "type")]
        module_type: String,

        /// Also create a remote repository
        #[arg(long)]
        repo: bool,

        /// Owner (user or organization) of the remote repository
        #[arg(long)]
        owner: Option<String>,
    },

    /// Run a git action across module repositories
    Git {
        #[arg(value_parser = ["status", "diff", "pull", "push"])]
        action: String,

        /// Restrict to a single module
        #[arg(long)]
        module: Option<String>,

        /// Commit message used when pushing uncommitted changes
        #[arg(short, long)]
        message: Option<String>,

        /// Only modules of this type (repeatable)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
    },

    /// Serve the tools as line-delimited JSON-RPC on stdin/stdout
    Serve,

    /// Write a default .modscope/config.toml
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON results and protocol messages
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));
    let config = cli.config.as_deref();

    let success = match cli.command {
        Commands::List { with_imports, types } => {
            cli::list::list_command(&work_dir, config, with_imports, types).await?
        }
        Commands::Info { name } => cli::info::info_command(&work_dir, config, &name).await?,
        Commands::Create {
            name,
            module_type,
            repo,
            owner,
        } => cli::create::create_command(&work_dir, config, &name, &module_type, repo, owner).await?,
        Commands::Git {
            action,
            module,
            message,
            types,
        } => cli::git::git_command(&work_dir, config, &action, module, message, types).await?,
        Commands::Serve => {
            cli::serve::serve_command(&work_dir, config).await?;
            true
        }
        Commands::Init { force } => {
            cli::init::init_command(&work_dir, config.map(PathBuf::from), force).await?;
            true
        }
    };

    if !success {
        std::process::exit(1);
    }

    Ok(())
}
