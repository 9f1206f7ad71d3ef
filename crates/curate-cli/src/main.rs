#![forbid(unsafe_code)]

mod cmd;
mod output;
mod workspace;

use clap::{CommandFactory, Parser, Subcommand};
use curate_core::config::{EffectiveConfig, resolve_config};
use curate_core::phase::Step;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "cur: phase-driven image curation",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Workflow root directory.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "Show progress of every phase",
        long_about = "Show each phase's predicate, progress counters and current image.",
        after_help = "EXAMPLES:\n    # Overview of the workflow in the current directory\n    cur status\n\n    # Emit machine-readable output\n    cur status --json"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one phase in detail",
        long_about = "Show a phase's actions, its full and work sets, and the image under its cursor.",
        after_help = "EXAMPLES:\n    # Show the active phase\n    cur show\n\n    # Show the second phase\n    cur show 2\n\n    # Show a specific image\n    cur show clean --item letters/a.jpg"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Navigate",
        about = "Move to the next image",
        long_about = "Advance a phase's cursor, wrapping around at the end.",
        after_help = "EXAMPLES:\n    # Next image in the active phase\n    cur next\n\n    # Next image that still needs work\n    cur next clean --work"
    )]
    Next(cmd::navigate::NavigateArgs),

    #[command(
        next_help_heading = "Navigate",
        about = "Move to the previous image",
        long_about = "Move a phase's cursor back, wrapping around at the start.",
        after_help = "EXAMPLES:\n    # Previous image in the active phase\n    cur prev\n\n    # Previous image that still needs work\n    cur prev 1 --work"
    )]
    Prev(cmd::navigate::NavigateArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Add or remove tags",
        long_about = "Apply signed tags to the current image; phases pick up the change immediately.",
        after_help = "EXAMPLES:\n    # Mark the current image cleaned\n    cur tag +cleaned\n\n    # Tag in a named phase\n    cur tag clean +cleaned -blurry"
    )]
    Tag(cmd::tag::TagArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Run a phase action",
        long_about = "Run the steps of one of a phase's configured actions against its current image.",
        after_help = "EXAMPLES:\n    # Press the Cleaned button of the active phase\n    cur act Cleaned\n\n    # Categorize through an action\n    cur act categorize Categorized --category letters"
    )]
    Act(cmd::act::ActArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Rename the current image",
        long_about = "Rename the image and its sidecar, keeping the image extension.",
        after_help = "EXAMPLES:\n    # Give the current image a name\n    cur rename grandma-1962"
    )]
    Rename(cmd::edit::RenameArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Move the current image into a category",
        long_about = "Move the image and its sidecar into an existing category directory. Use `cur category create` for a new one.",
        after_help = "EXAMPLES:\n    # File the current image under letters\n    cur categorize letters"
    )]
    Categorize(cmd::edit::CategorizeArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Store a transcription",
        long_about = "Write transcription text to the current image's sidecar.",
        after_help = "EXAMPLES:\n    # Inline text\n    cur transcribe \"Dear Ann,\"\n\n    # From a file\n    cur transcribe --file note.txt"
    )]
    Transcribe(cmd::edit::TranscribeArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Delete the current image",
        long_about = "Remove the image and its sidecar from disk and from every phase.",
        after_help = "EXAMPLES:\n    # Delete the current image of the active phase\n    cur delete\n\n    # Delete a specific image\n    cur delete --item blurry.jpg"
    )]
    Delete(cmd::edit::DeleteArgs),

    #[command(
        next_help_heading = "Image Tools",
        about = "Rotate the current image counter-clockwise",
        after_help = "EXAMPLES:\n    cur rotate-left"
    )]
    RotateLeft(cmd::external::ExternalArgs),

    #[command(
        next_help_heading = "Image Tools",
        about = "Rotate the current image clockwise",
        after_help = "EXAMPLES:\n    cur rotate-right"
    )]
    RotateRight(cmd::external::ExternalArgs),

    #[command(
        next_help_heading = "Image Tools",
        about = "Crop the current image interactively",
        long_about = "Open cropgui on the current image and replace it with the cropped result.",
        after_help = "EXAMPLES:\n    cur crop"
    )]
    Crop(cmd::external::ExternalArgs),

    #[command(next_help_heading = "Categories", about = "Manage categories")]
    Category {
        #[command(subcommand)]
        command: cmd::category::CategoryCommand,
    },

    #[command(
        next_help_heading = "Categories",
        about = "List recently used categories",
        after_help = "EXAMPLES:\n    cur recent"
    )]
    Recent,

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    cur completions bash\n\n    # Generate zsh completions\n    cur completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CURATE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "cur=debug,info"
        } else {
            "cur=info,warn"
        })
    });

    let format = env::var("CURATE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(
    cli: &Cli,
    config: anyhow::Result<EffectiveConfig>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let root = cli.root.as_path();
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let config = config?.workflow;
    match &cli.command {
        Commands::Status(args) => cmd::status::run_status(args, output, root, &config),
        Commands::Show(args) => cmd::show::run_show(args, output, root, &config),
        Commands::Next(args) => cmd::navigate::run_navigate(
            args,
            cmd::navigate::Direction::Next,
            output,
            root,
            &config,
        ),
        Commands::Prev(args) => cmd::navigate::run_navigate(
            args,
            cmd::navigate::Direction::Prev,
            output,
            root,
            &config,
        ),
        Commands::Tag(args) => cmd::tag::run_tag(args, output, root, &config),
        Commands::Act(args) => cmd::act::run_act(args, output, root, &config),
        Commands::Rename(args) => cmd::edit::run_rename(args, output, root, &config),
        Commands::Categorize(args) => cmd::edit::run_categorize(args, output, root, &config),
        Commands::Transcribe(args) => cmd::edit::run_transcribe(args, output, root, &config),
        Commands::Delete(args) => cmd::edit::run_delete(args, output, root, &config),
        Commands::RotateLeft(args) => {
            cmd::external::run_external(args, &Step::RotateLeft, output, root, &config)
        }
        Commands::RotateRight(args) => {
            cmd::external::run_external(args, &Step::RotateRight, output, root, &config)
        }
        Commands::Crop(args) => {
            cmd::external::run_external(args, &Step::Crop, output, root, &config)
        }
        Commands::Category { command } => {
            cmd::category::run_category(command, output, root, &config)
        }
        Commands::Recent => cmd::category::run_recent(output, root, &config),
        Commands::Completions(_) => Ok(()),
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let config = resolve_config(&cli.root, cli.json);
    // A broken config still reports in the mode the flags ask for.
    let output = match &config {
        Ok(config) => OutputMode::from_resolved(&config.resolved_output),
        Err(_) if cli.json => OutputMode::Json,
        Err(_) => OutputMode::from_resolved("text"),
    };

    if let Err(e) = run(&cli, config, output) {
        if let Err(render) = render_error(output, &CliError::from(&e)) {
            eprintln!("error: {e:#} ({render})");
        }
        std::process::exit(1);
    }
}
