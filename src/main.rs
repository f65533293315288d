//! `latent-transforms` CLI - apply latent filters to JSON latents or image files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use latent_transforms::latent::{self, Latent, Mask};
use latent_transforms::nodes::{NodeInputs, NodeRegistry, Params};
use latent_transforms::{image, FilterConfig, SafetyClamp};

/// Apply latent transform nodes outside of a graph host.
#[derive(Parser, Debug)]
#[command(name = "latent-transforms")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered nodes with their inputs and parameters.
    List {
        /// Print the node declarations as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Apply one node to an input and write the result.
    Apply(ApplyArgs),
}

#[derive(clap::Args, Debug)]
struct ApplyArgs {
    /// Node identifier, e.g. "LT: Blur".
    #[arg(value_name = "NODE")]
    node: String,

    /// Input path: a `.json` latent, or any image file.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output path: `.json` writes a latent, anything else an image.
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Second input for two-input nodes.
    #[arg(long, value_name = "PATH")]
    input_b: Option<PathBuf>,

    /// Blend mask: a `.json` mask, or a grayscale image.
    #[arg(long, value_name = "PATH")]
    mask: Option<PathBuf>,

    /// Parameter assignment, repeatable.
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Leave tone adjustments unclamped.
    #[arg(long)]
    no_safety_clamp: bool,

    /// Lower bound of the safety clamp.
    #[arg(long, default_value = "-10.0", value_name = "FLOAT", allow_hyphen_values = true)]
    clamp_min: f32,

    /// Upper bound of the safety clamp.
    #[arg(long, default_value = "10.0", value_name = "FLOAT", allow_hyphen_values = true)]
    clamp_max: f32,

    /// Record `downscale_ratio_spacial = 8` in the output latent.
    #[arg(long)]
    tag_downscale_ratio: bool,

    /// Output JPEG quality (1-100).
    #[arg(short, long, default_value = "95", value_name = "INT")]
    quality: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("latent_transforms={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let registry = NodeRegistry::builtin();
    let result = match &cli.command {
        Command::List { json } => list(&registry, *json),
        Command::Apply(args) => apply(&registry, args),
    };

    if let Err(err) = result {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn list(registry: &NodeRegistry, json: bool) -> Result<()> {
    if json {
        let nodes: Vec<_> = registry
            .iter()
            .map(|node| {
                serde_json::json!({
                    "id": node.id(),
                    "display_name": node.display_name(),
                    "category": node.category(),
                    "inputs": node.inputs(),
                    "params": node.params(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    for node in registry.iter() {
        println!("{} ({})", node.display_name(), node.category());
        for input in node.inputs() {
            let optional = if input.optional { ", optional" } else { "" };
            println!("    <{}> {:?}{optional}", input.name, input.kind);
        }
        for param in node.params() {
            println!("    {param}");
        }
    }
    Ok(())
}

fn apply(registry: &NodeRegistry, args: &ApplyArgs) -> Result<()> {
    if !(1..=100).contains(&args.quality) {
        anyhow::bail!("quality must be between 1 and 100, got {}", args.quality);
    }

    let node = registry.get(&args.node)?;
    let params = Params::parse_assignments(node.params(), &args.params)
        .with_context(|| format!("Invalid parameters for {}", args.node))?;
    node.validate(&params)?;

    // Build configuration
    let config = FilterConfig {
        safety_clamp: (!args.no_safety_clamp).then_some(SafetyClamp {
            min: args.clamp_min,
            max: args.clamp_max,
        }),
        tag_downscale_ratio: args.tag_downscale_ratio,
    };
    config.validate()?;

    let latent_a = load_latent(&args.input)?;
    let latent_b = args.input_b.as_deref().map(load_latent).transpose()?;
    let mask = args.mask.as_deref().map(load_mask).transpose()?;

    let mut inputs = NodeInputs::new(&latent_a);
    if let Some(latent_b) = &latent_b {
        inputs = inputs.with_latent_b(latent_b);
    }
    if let Some(mask) = &mask {
        inputs = inputs.with_mask(mask);
    }

    tracing::info!("Applying {} to {}", node.id(), args.input.display());
    let output = node
        .apply(&inputs, &params, &config)
        .with_context(|| format!("Failed to apply {}", args.node))?;

    save_latent(&output, &args.output, args.quality)?;
    tracing::info!("Wrote {}", args.output.display());
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn load_latent(path: &Path) -> Result<Latent> {
    let loaded = if is_json(path) {
        latent::load_latent(path)
    } else {
        image::load_image(path)
    };
    loaded.with_context(|| format!("Failed to read {}", path.display()))
}

fn load_mask(path: &Path) -> Result<Mask> {
    let loaded = if is_json(path) {
        latent::load_mask(path)
    } else {
        image::load_mask_image(path)
    };
    loaded.with_context(|| format!("Failed to read mask {}", path.display()))
}

fn save_latent(latent: &Latent, path: &Path, quality: u8) -> Result<()> {
    let saved = if is_json(path) {
        latent::save_latent(latent, path)
    } else {
        image::save_image(latent, path, quality)
    };
    saved.with_context(|| format!("Failed to write {}", path.display()))
}
