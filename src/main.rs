use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use slmrnd_data::config::RunConfig;
use slmrnd_data::data::model::ScenarioId;
use slmrnd_data::ScenarioDataset;

/// Load SLMRND scenario inputs and write diagnostics.
#[derive(Debug, Parser)]
#[command(name = "slmrnd-data", version)]
struct Cli {
    /// JSON run configuration.
    #[arg(short, long)]
    config: PathBuf,

    /// Scenario for the structure dumps (default: first of each group).
    #[arg(short, long)]
    scenario: Option<ScenarioId>,

    /// Write the flattened v matrix to this CSV.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Search the coverage threshold tau.
    #[arg(long)]
    tau: bool,

    /// Print demands and capacities of the diagnostic scenario.
    #[arg(long)]
    print: bool,
}

/// `dir/name` with `_<label>` inserted before the extension.
fn labelled(path: &Path, label: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{label}.{ext}"),
        None => format!("{stem}_{label}"),
    };
    path.with_file_name(name)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = RunConfig::from_path(&cli.config)
        .with_context(|| format!("reading run configuration {}", cli.config.display()))?;
    let files = config.scenario_files();
    let output_dir = config.output_dir();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let subsets = config.scenario_subsets();
    info!(
        "{} {} scenarios of {}, {} group(s)",
        config.scenario_count,
        config.method,
        config.district,
        subsets.len()
    );

    for subset in &subsets {
        let label = subset
            .iter()
            .map(ScenarioId::to_string)
            .collect::<Vec<_>>()
            .join("_");

        let dataset = ScenarioDataset::load_with(&files.subset(subset), config.options())
            .with_context(|| format!("loading scenarios {label}"))?;

        let scenario = match cli.scenario {
            Some(s) => s,
            None => *dataset
                .scenarios()
                .first()
                .context("dataset without scenarios")?,
        };

        let v0_out = output_dir.join(format!("v0_structure_output_scenario_{label}.txt"));
        dataset.check_v0_structure(scenario, &v0_out)?;
        let v_out = output_dir.join(format!("v_structure_output_scenario_{label}.txt"));
        dataset.check_v_structure(scenario, &v_out)?;
        info!(
            "scenarios {label}: structure dumps in {}",
            output_dir.display()
        );

        for (s, supply) in dataset.max_supply() {
            info!("scenarios {label}: O_max[{s}] = {supply}");
        }

        if let Some(export) = &cli.export {
            let path = if subsets.len() > 1 {
                labelled(export, &label)
            } else {
                export.clone()
            };
            dataset
                .export_v_dict(&path)
                .with_context(|| format!("exporting v to {}", path.display()))?;
            info!("scenarios {label}: v exported to {}", path.display());
        }

        if cli.tau {
            println!("scenarios {label}: tau = {}", dataset.tau());
        }

        if cli.print {
            dataset
                .print_demands_and_capacities(scenario)
                .context("writing to stdout")?;
        }
    }

    Ok(())
}
