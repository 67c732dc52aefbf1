//! `hhstat plot`: combined limits to a multi-page document.

use anyhow::{Context, Result};
use clap::Args;
use hh_core::LimitMap;
use hh_viz::{PanelPattern, Production};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct PlotArgs {
    /// Directory holding all_limits.json; also the default output location
    #[arg(short, long)]
    pub input: PathBuf,

    /// Combined limits file. Defaults to `<input>/all_limits.json`.
    #[arg(long)]
    pub limits: Option<PathBuf>,

    /// Panel definitions (YAML). Defaults to the year/channel layout.
    #[arg(long)]
    pub panels: Option<PathBuf>,

    /// Render config (YAML) merged over the selected theme
    #[arg(long)]
    pub viz_config: Option<PathBuf>,

    /// Output document (.svg, .pdf or .png). Defaults to `<input>/limits_sm.pdf`
    /// (`.svg` when built without PDF support).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write one SVG per page into this directory
    #[arg(long)]
    pub svg_dir: Option<PathBuf>,

    /// Reference limits; adds a ratio panel of expected limits
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Draw observed limits (otherwise blinded)
    #[arg(long)]
    pub show_observed: bool,

    /// Data-taking years of the default layout
    #[arg(long, num_args = 1.., default_values_t = [2016u32, 2017, 2018])]
    pub years: Vec<u32>,

    /// Channels of the default layout
    #[arg(long, num_args = 1.., default_values = ["eTau", "muTau", "tauTau"])]
    pub channels: Vec<String>,

    /// Use the VBF y ranges for the default layout
    #[arg(long)]
    pub vbf: bool,
}

#[cfg(feature = "pdf")]
const DEFAULT_OUTPUT: &str = "limits_sm.pdf";
#[cfg(not(feature = "pdf"))]
const DEFAULT_OUTPUT: &str = "limits_sm.svg";

pub fn cmd_plot(args: &PlotArgs) -> Result<()> {
    let limits_path =
        args.limits.clone().unwrap_or_else(|| args.input.join(hh_sweep::aggregate::ALL_LIMITS_FILE));
    let limits = load_limits(&limits_path)?;
    let reference = args.reference.as_deref().map(load_limits).transpose()?;

    let patterns: Vec<PanelPattern> = match &args.panels {
        Some(path) => hh_viz::load_patterns(path)
            .with_context(|| format!("failed to load panels {}", path.display()))?,
        None => {
            let production = if args.vbf { Production::Vbf } else { Production::Ggf };
            hh_viz::default_patterns(&args.years, &args.channels, production)
        }
    };

    let config = match &args.viz_config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            hh_viz_render::resolve_config(Some(&text))
                .with_context(|| format!("invalid render config {}", path.display()))?
        }
        None => hh_viz_render::resolve_config(None)?,
    };

    let artifacts = hh_viz::build_panels(&limits, &patterns, reference.as_ref(), args.show_observed);
    tracing::info!(panels = patterns.len(), complete = artifacts.len(), "built limit panels");
    if artifacts.is_empty() {
        anyhow::bail!(
            "none of the {} panels has all of its keys in {}",
            patterns.len(),
            limits_path.display()
        );
    }

    let doc = hh_viz_render::render_document(&artifacts, &config)?;
    let output = args.output.clone().unwrap_or_else(|| args.input.join(DEFAULT_OUTPUT));
    for path in doc.save(&output, config.output.dpi)? {
        println!("{}", path.display());
    }
    if let Some(dir) = &args.svg_dir {
        for path in doc.write_svg_pages(dir)? {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn load_limits(path: &Path) -> Result<LimitMap> {
    LimitMap::load(path).with_context(|| format!("failed to read limits {}", path.display()))
}
