/*
 * compile.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compile command implementation
 */

//! `stencil compile`: compile a template (or reuse its cached program) and
//! print the program's path.

use anyhow::Result;
use tracing::info;

use super::{TemplateArgs, template_error};

/// Execute the compile command
pub fn execute(args: TemplateArgs) -> Result<()> {
    let renderer = args.renderer()?;
    let document = args.document()?;

    let cached = renderer
        .compile(&document)
        .map_err(|e| template_error(e, "compile", &args.input))?;

    if cached.regenerated {
        info!("Compiled {}", args.input);
    } else {
        info!("Reused cached program for {}", args.input);
    }
    println!("{}", cached.path.display());
    Ok(())
}
