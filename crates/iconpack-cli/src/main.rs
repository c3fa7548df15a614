mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE};
use iconpack_codegen::CollisionPolicy;
use iconpack_core::{PublishRequest, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "iconpack",
    version,
    about = "Turn icon service projects into React component packages"
)]
struct Cli {
    /// Path to iconpack.toml.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a project's icons, build the package and upload it to the feed.
    Publish {
        /// Icon service project id.
        #[arg(long)]
        project_id: String,
        /// Project name; the package name is derived from it.
        #[arg(long)]
        project_name: String,
        /// Listing page.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Icons per listing page.
        #[arg(long, default_value_t = 100)]
        per_page: u32,
        /// Listing sort key.
        #[arg(long, default_value = "-iconId")]
        sort: String,
    },
    /// Build a package from a local directory of SVG files without uploading it.
    Generate {
        /// Directory containing *.svg files.
        dir: PathBuf,
        /// Project name; the package name is derived from it.
        #[arg(long)]
        name: String,
        /// Directory that receives the package tree and archive.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// What to do when two files map to the same component name (fail, suffix).
        #[arg(long, default_value = "fail")]
        collisions: CollisionPolicy,
        /// Package version.
        #[arg(long)]
        package_version: Option<String>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ICONPACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Publish {
            project_id,
            project_name,
            page,
            per_page,
            sort,
        } => {
            let request = PublishRequest {
                project_id,
                project_name,
                page,
                per_page,
                sort,
            };
            commands::publish::run(&cli.config, &request, json_output)
        }
        Commands::Generate {
            dir,
            name,
            out,
            collisions,
            package_version,
        } => commands::generate::run(
            &dir,
            &name,
            &out,
            collisions,
            package_version.as_deref(),
            json_output,
        ),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("config error:") {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
