mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cdk-workshop")]
#[command(about = "Synthesize the CDK workshop stack into a CloudFormation assembly", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the stack and write the cloud assembly
    Synth {
        /// Output directory (defaults to `output` in cdk.json, then cdk.out)
        #[arg(short, long, env = "CDK_OUTDIR")]
        output: Option<PathBuf>,
        /// Print nothing on success
        #[arg(short, long)]
        quiet: bool,
    },
    /// Compare the stack with the template in the output directory
    Diff {
        /// Output directory holding the previous assembly
        #[arg(short, long, env = "CDK_OUTDIR")]
        output: Option<PathBuf>,
    },
    /// List stacks and their declarations
    #[command(alias = "ls")]
    List,
    /// Synthesize in memory and report problems
    Validate,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the template, so logs go to stderr
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    // version needs no config
    if matches!(cli.command, Commands::Version) {
        println!("cdk-workshop {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let result = match cli.command {
        Commands::Synth { output, quiet } => commands::synth::handle(output, quiet).await,
        Commands::Diff { output } => commands::diff::handle(output).await,
        Commands::List => commands::list::handle(),
        Commands::Validate => commands::validate::handle(),
        Commands::Version => unreachable!("Version is handled before config loading"),
    };

    if let Err(e) = result {
        eprintln!();
        eprintln!("{}", "✗ Error".red().bold());
        for cause in e.chain() {
            eprintln!("  {}", cause);
        }
        std::process::exit(1);
    }

    Ok(())
}
