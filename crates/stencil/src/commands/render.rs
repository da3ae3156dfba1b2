/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! Render command implementation.
//!
//! `stencil render` compiles the template (or reuses its cached program),
//! renders it with a values file and writes the result to a file or stdout.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use stencil_template::Value;

use super::{TemplateArgs, template_error};

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    pub template: TemplateArgs,
    /// Values file path
    pub values: String,
    /// Output file path; stdout when absent
    pub output: Option<String>,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let renderer = args.template.renderer()?;
    let document = args.template.document()?;
    let values = load_values(Path::new(&args.values))?;

    debug!("Rendering: {}", args.template.input);
    let result = renderer
        .render(&document, &values)
        .map_err(|e| template_error(e, "render", &args.template.input))?;

    match &args.output {
        Some(output) => {
            let output_path = PathBuf::from(output);
            result
                .write_to(&output_path)
                .with_context(|| format!("Failed to write output file {}", output))?;
            info!("Output: {}", output_path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", result.to_xml_string())
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

/// Read a values file: YAML for `.yaml`/`.yml`, JSON otherwise.
pub fn load_values(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read values file {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let json: serde_json::Value = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    };
    Ok(Value::from(json))
}
