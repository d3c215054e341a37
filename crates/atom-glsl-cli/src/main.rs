use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use atom_glsl::{
    analyze_material, extract_model, extract_uniform_block_bindings, resolve_model_placement,
    Contribution, WrapperDescriptor,
};
use clap::{Parser, Subcommand};

mod logging;

use logging::{init_logging, LoggingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "atom-glsl",
    version,
    about = "Scan, place, and analyze combined-stage GLSL sources."
)]
struct Cli {
    /// Log filter in `env_logger` syntax (defaults to RUST_LOG, then info)
    #[arg(long, global = true, value_name = "FILTER")]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the declaration model of a combined source as JSON
    Model {
        file: PathBuf,
    },

    /// Move `placetarget`-tagged declarations into their stages
    Place {
        file: PathBuf,

        /// Auxiliary resource script contributing declarations (repeatable)
        #[arg(long = "contrib", value_name = "FILE")]
        contributions: Vec<PathBuf>,

        /// Write the rewritten source here instead of stdout
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// List the binding slots used by std140 uniform blocks
    Bindings {
        file: PathBuf,
    },

    /// Build the material-property descriptor tree of a generated wrapper
    Material {
        /// Descriptor table emitted with the wrapper (JSON)
        descriptor: PathBuf,

        /// The wrapper's generated source
        wrapper_source: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig {
        env_filter: cli.log.clone(),
        ..Default::default()
    });
    run(cli.command)
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Model { file } => {
            let source = read(&file)?;
            let model = extract_model(&source)
                .with_context(|| format!("scan {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&model)?);
        }

        Command::Place { file, contributions, output } => {
            let source = read(&file)?;
            let model = extract_model(&source)
                .with_context(|| format!("scan {}", file.display()))?;

            let mut parsed = Vec::with_capacity(contributions.len());
            for path in &contributions {
                let name = contribution_name(path)?;
                let text = read(path)?;
                let contribution = Contribution::parse(&name, &text)
                    .with_context(|| format!("parse contribution {}", path.display()))?;
                log::info!(
                    "contribution `{}` ({}) from {}",
                    contribution.name,
                    contribution.interface_name,
                    path.display()
                );
                parsed.push(contribution);
            }

            let placed = resolve_model_placement(&model.with_contributions(parsed))
                .with_context(|| format!("place declarations of {}", file.display()))?;
            match output {
                Some(out) => {
                    fs::write(&out, placed).with_context(|| format!("write {}", out.display()))?;
                    log::info!("wrote {}", out.display());
                }
                None => print!("{}", placed),
            }
        }

        Command::Bindings { file } => {
            let source = read(&file)?;
            let bindings = extract_uniform_block_bindings(&source);
            println!("{}", serde_json::to_string(&bindings)?);
        }

        Command::Material { descriptor, wrapper_source } => {
            let table = read(&descriptor)?;
            let table: WrapperDescriptor = serde_json::from_str(&table)
                .with_context(|| format!("parse descriptor table {}", descriptor.display()))?;
            let source = read(&wrapper_source)?;
            let tree = analyze_material(&table, &source);
            if tree.is_empty() {
                log::warn!("`{}` has no material properties", table.type_name);
            }
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
    }
    Ok(())
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

/// A contribution is named after its file stem.
fn contribution_name(path: &Path) -> anyhow::Result<String> {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => Ok(stem.to_string()),
        _ => bail!("cannot derive a contribution name from {}", path.display()),
    }
}
