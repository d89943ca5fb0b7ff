//! Canopy CLI
//!
//! Loads a model description, applies a view selector, and prints the
//! resulting view.
//!
//! Run with: cargo run --bin canopy -- model.json --select 'panel * strip[even]'

mod description;
mod render;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use canopy_common::{DiagnosticSink, StderrSink};
use canopy_model::NodeId;
use canopy_view::{Normalization, View};
use clap::Parser;

use description::NodeDescription;

/// Canopy - inspect selector views of a point model
#[derive(Parser, Debug)]
#[command(name = "canopy")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Every strip, normalized to the selection
    canopy demos/panels.json --select strip

    # One group per panel, keeping the model's coordinates
    canopy demos/panels.json --select 'panel * strip[even]' -n absolute

    # Print points and emit JSON
    canopy demos/panels.json --select 'panel[0]; panel[2] > strip[1]' --points
    canopy demos/panels.json --select 'group1 & group2' --json
"#)]
struct Cli {
    /// Path to a JSON model description
    #[arg(value_name = "MODEL")]
    model: PathBuf,

    /// View selector, e.g. "panel * strip[0-4:2]"
    #[arg(short, long, value_name = "SELECTOR")]
    select: String,

    /// Normalization mode: relative or absolute
    #[arg(short, long, default_value = "relative")]
    normalization: Normalization,

    /// Print the view as JSON instead of a tree
    #[arg(long)]
    json: bool,

    /// List the points under each leaf node
    #[arg(long)]
    points: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let text = fs::read_to_string(&cli.model)
        .with_context(|| format!("failed to read '{}'", cli.model.display()))?;
    let description = NodeDescription::from_json(&text)
        .with_context(|| format!("invalid model description in '{}'", cli.model.display()))?;
    let model = Arc::new(description.build());

    let view = View::create(&model, &cli.select, cli.normalization)
        .context("failed to create view")?;

    let mut stderr = StderrSink::new();
    for warning in view.warnings() {
        stderr.warn(warning.clone());
    }

    if cli.json {
        println!("{}", render::to_json(&view)?);
    } else {
        render::print_summary(&view);
        render::print_tree(view.model(), NodeId::ROOT, 0, cli.points);
    }

    view.dispose();
    Ok(())
}
