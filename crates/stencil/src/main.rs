//! Stencil CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::TemplateArgs;

#[derive(Parser)]
#[command(name = "stencil")]
#[command(version)]
#[command(about = "Compile and render placeholder templates in XML documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template document with a values file
    Render {
        #[command(flatten)]
        template: TemplateArgs,

        /// Values file (JSON, or YAML for .yaml/.yml)
        #[arg(long, value_name = "FILE")]
        values: String,

        /// Write output to FILE instead of stdout
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<String>,
    },

    /// Compile a template document (or reuse its cached program)
    Compile {
        #[command(flatten)]
        template: TemplateArgs,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stencil=info,stencil_template=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            values,
            output,
        } => commands::render::execute(commands::render::RenderArgs {
            template,
            values,
            output,
        }),
        Commands::Compile { template } => commands::compile::execute(template),
    }
}
