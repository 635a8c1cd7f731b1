use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use dxil_spirv::dxil::{Module, ResourceClass};
use dxil_spirv::{ConvertOptions, ConvertedFunction};

#[derive(Parser)]
#[command(name = "dxil-spirv")]
#[command(about = "Lower a DXIL entry point into a SPIR-V node graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a JSON-serialised DXIL module and print the lowered graph.
    Dump {
        #[arg(help = "Input module (JSON object model)")]
        input: PathBuf,

        #[arg(long, default_value = "main", help = "SPIR-V entry point name")]
        entry_name: String,

        #[arg(long, help = "Fail on the first unsupported construct")]
        strict: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            input,
            entry_name,
            strict,
        } => {
            let module = read_module(&input)?;
            let options = ConvertOptions {
                entry_point_name: entry_name,
                deny_unsupported: strict,
            };
            let converted = dxil_spirv::convert(&module, &options)
                .with_context(|| format!("Conversion of {} failed", input.display()))?;
            print!("{}", summary(&converted));
        }
    }

    Ok(())
}

fn read_module(path: &Path) -> Result<Module> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {} as a DXIL module", path.display()))
}

fn summary(converted: &ConvertedFunction) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let model = converted
        .execution_model
        .map_or_else(|| "none".to_owned(), |m| format!("{m:?}"));
    let _ = writeln!(out, "entry point: {} ({model})", converted.entry_point_name);

    let resources = &converted.resources;
    let _ = writeln!(
        out,
        "resources: {} srv, {} uav, {} cbv, {} sampler",
        resources.len(ResourceClass::Srv),
        resources.len(ResourceClass::Uav),
        resources.len(ResourceClass::Cbv),
        resources.len(ResourceClass::Sampler),
    );
    let _ = writeln!(
        out,
        "signature: {} inputs, {} outputs",
        converted.inputs.len(),
        converted.outputs.len()
    );
    if !converted.local_variables.is_empty() {
        let _ = writeln!(out, "locals: {}", converted.local_variables.len());
    }
    let _ = writeln!(out);

    out.push_str(&converted.node_pool.render(&converted.visit_order));

    if !converted.diagnostics.is_empty() {
        let _ = writeln!(out, "\ndiagnostics:");
        for diagnostic in &converted.diagnostics {
            let _ = writeln!(out, "  {diagnostic}");
        }
    }
    out
}
