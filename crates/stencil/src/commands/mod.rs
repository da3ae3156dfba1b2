//! Command implementations for the stencil CLI
//!
//! Each command module handles the CLI interface and delegates to
//! stencil-template for the actual work.

pub mod compile;
pub mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use stencil_template::{Delimiters, RenderConfig, Renderer, TemplateError, XmlFileDocument};

/// Options shared by every command that loads a template document.
#[derive(Debug, Clone, Args)]
pub struct TemplateArgs {
    /// Template document (XML)
    pub input: String,

    /// Directory for compiled programs (created if missing)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<String>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Always recompile, ignoring cached programs
    #[arg(long)]
    pub debug: bool,

    /// Reuse cached programs without checking the source for changes
    #[arg(long)]
    pub no_track: bool,

    /// Opening placeholder delimiter
    #[arg(long, value_name = "S", requires = "close")]
    pub open: Option<String>,

    /// Closing placeholder delimiter
    #[arg(long, value_name = "S", requires = "open")]
    pub close: Option<String>,
}

impl TemplateArgs {
    /// Resolve the render configuration: config file first, flags on top.
    pub fn config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::from_file(Path::new(path))
                .with_context(|| format!("Failed to load config file {}", path))?,
            None => RenderConfig::default(),
        };

        if let Some(dir) = &self.cache_dir {
            config.cache_dir = PathBuf::from(dir);
        }
        if let (Some(open), Some(close)) = (&self.open, &self.close) {
            config.delimiters = Delimiters::new(open.as_str(), close.as_str())?;
        }
        if self.debug {
            config.debug = true;
        }
        if self.no_track {
            config.track_documents = false;
        }
        Ok(config)
    }

    /// Build a renderer, creating the cache directory if needed.
    pub fn renderer(&self) -> Result<Renderer> {
        let config = self.config()?;
        std::fs::create_dir_all(&config.cache_dir).with_context(|| {
            format!(
                "Failed to create cache directory {}",
                config.cache_dir.display()
            )
        })?;
        Ok(Renderer::new(config)?)
    }

    pub fn document(&self) -> Result<XmlFileDocument> {
        XmlFileDocument::new(&self.input)
            .with_context(|| format!("Failed to open template {}", self.input))
    }
}

/// Attach command context to a template error. Placeholder syntax errors
/// name the markup as the culprit rather than the command.
pub fn template_error(err: TemplateError, action: &str, input: &str) -> anyhow::Error {
    let message = if err.is_syntax_error() {
        format!("Invalid placeholder markup in {}", input)
    } else {
        format!("Failed to {} {}", action, input)
    };
    anyhow::Error::new(err).context(message)
}
