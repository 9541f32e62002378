// =============================================================================
// SMS PHISH GUARD
// =============================================================================
//
// A message says it is from your bank. The link says otherwise.
//
// Pull brand key words out of an SMS, fuzzy-match them against a curated
// whitelist of organizations, and check whether the URL in the message sits
// on the registrable domain of the brand it claims to be.
//
//   check    - diagnose a dataset of (sms, site) pairs
//   convert  - Label Studio export -> training set
//   train    - training set -> gazetteer entity model
// =============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use sms_phish_guard::batch::{self, run_batch};
use sms_phish_guard::cli::{CheckArgs, Cli, Command, ConvertArgs, TrainArgs};
use sms_phish_guard::config::{CheckConfig, EngineConfig, LogFormat};
use sms_phish_guard::dataset;
use sms_phish_guard::engine::DecisionEngine;
use sms_phish_guard::extractor::GazetteerModel;
use sms_phish_guard::matcher::FuzzyMatcher;
use sms_phish_guard::models::Sample;
use sms_phish_guard::training;
use sms_phish_guard::whitelist::Whitelist;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(true)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .init(),
    }
}

fn main() -> Result<()> {
    // Missing required options make clap exit here, before any work.
    let cli = Cli::parse();

    let engine_config = EngineConfig::from_env().context("invalid environment configuration")?;
    init_tracing(engine_config.log_format);

    match cli.command {
        Command::Check(args) => check(args, engine_config),
        Command::Convert(args) => convert(args),
        Command::Train(args) => train(args),
    }
}

fn check(args: CheckArgs, engine_config: EngineConfig) -> Result<()> {
    let config: CheckConfig = args.into_config(engine_config);
    config.validate().context("invalid configuration")?;

    info!(
        white_list = %config.white_list.display(),
        model = %config.model_path.display(),
        to_test = %config.to_test.display(),
        threshold = config.engine.threshold,
        workers = config.engine.workers,
        "Phish guard starting"
    );

    let whitelist = Whitelist::load(&config.white_list).context("failed to load whitelist")?;
    if whitelist.is_empty() {
        warn!("Whitelist is empty, every sample will come back as no match");
    }

    let mut model =
        GazetteerModel::load(&config.model_path).context("failed to load entity model")?;
    if !config.labels.is_empty() {
        model = model.with_labels(config.labels.iter().cloned());
    }

    let samples: Vec<Sample> =
        dataset::read_records(&config.to_test).context("failed to load input dataset")?;

    let engine = DecisionEngine::new(whitelist, model, FuzzyMatcher::new(config.engine.threshold));
    let outcome = run_batch(&engine, &samples, config.engine.workers)
        .context("failed to start worker pool")?;

    if let Some(path) = &config.output_file {
        batch::persist(path, samples, &outcome.outcomes)
            .context("failed to write diagnosed dataset")?;
    }

    if let Some(path) = &config.report_file {
        let report = outcome.report(config.engine.threshold, config.engine.workers);
        dataset::write_json(path, &report).context("failed to write run report")?;
        info!(path = %path.display(), "Run report written");
    }

    Ok(())
}

fn convert(args: ConvertArgs) -> Result<()> {
    training::convert_label_studio(&args.labelstud, &args.path_dest)
        .context("failed to convert Label Studio export")?;
    Ok(())
}

fn train(args: TrainArgs) -> Result<()> {
    if let Some(labelstud) = &args.labelstud {
        training::convert_label_studio(labelstud, &args.dataset)
            .context("failed to convert Label Studio export")?;
    }
    training::train_model(&args.dataset, &args.model).context("failed to train entity model")?;
    Ok(())
}
