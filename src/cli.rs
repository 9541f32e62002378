use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{CheckConfig, EngineConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Diagnose every (sms, site) row of a dataset against the whitelist
    Check(CheckArgs),
    /// Convert a Label Studio export into a training set
    Convert(ConvertArgs),
    /// Compile a training set into a gazetteer entity model
    Train(TrainArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Whitelist table (JSON array or .jsonl)
    #[arg(short = 'w', long = "white-list", value_name = "PATH")]
    pub white_list: PathBuf,

    /// Entity model directory (or patterns .jsonl file)
    #[arg(short = 'm', long, value_name = "PATH")]
    pub model_path: PathBuf,

    /// Dataset of samples with `sms` and `site` columns
    #[arg(short = 't', long, value_name = "PATH")]
    pub to_test: PathBuf,

    /// Write the dataset plus a `diagnosis` column here
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Write a JSON run report here
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Similarity threshold, overrides PHISH_GUARD_THRESHOLD
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Worker threads, overrides PHISH_GUARD_WORKERS
    #[arg(long)]
    pub workers: Option<usize>,

    /// Only use entities with these labels (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,
}

impl CheckArgs {
    /// Merge with environment-derived settings; flags win.
    pub fn into_config(self, mut engine: EngineConfig) -> CheckConfig {
        if let Some(threshold) = self.threshold {
            engine.threshold = threshold;
        }
        if let Some(workers) = self.workers {
            engine.workers = workers;
        }

        CheckConfig {
            white_list: self.white_list,
            model_path: self.model_path,
            to_test: self.to_test,
            output_file: self.output_file,
            report_file: self.report,
            labels: self.labels,
            engine,
        }
    }
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Label Studio JSON export
    #[arg(short = 'l', long, value_name = "PATH")]
    pub labelstud: PathBuf,

    /// Where to write the training set
    #[arg(short = 'd', long, value_name = "PATH")]
    pub path_dest: PathBuf,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training set to read (written first when --labelstud is given)
    #[arg(short = 'd', long, value_name = "PATH")]
    pub dataset: PathBuf,

    /// Model directory to write
    #[arg(short = 's', long, value_name = "PATH")]
    pub model: PathBuf,

    /// Convert this Label Studio export before training
    #[arg(short = 'l', long, value_name = "PATH")]
    pub labelstud: Option<PathBuf>,
}
