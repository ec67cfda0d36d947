//! topoprep CLI - preprocess image datasets and run training configs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use topoprep::dataset::{CsvOptions, DenseDesignMatrix};
use topoprep::preprocessing::Pipeline;
use topoprep::space::{Axes, DefaultViewConverter};
use topoprep::train::load_train_file;

/// Dataset preprocessing and training driver
#[derive(Parser, Debug)]
#[command(name = "topoprep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a JSON pipeline to a CSV design matrix
    Preprocess {
        /// Pipeline config: a JSON array of preprocessor steps
        #[arg(short, long)]
        config: PathBuf,

        /// Input CSV, one example per record
        #[arg(short, long)]
        input: PathBuf,

        /// Non-batch shape of one example, e.g. 32,32,3
        #[arg(short, long, value_delimiter = ',', required = true)]
        shape: Vec<usize>,

        /// Axis order of the flattened data, e.g. b,0,1,c
        #[arg(long)]
        axes: Option<Axes>,

        /// Skip the first CSV record
        #[arg(long)]
        header: bool,

        /// Output CSV path
        #[arg(short, long, default_value = "preprocessed.csv")]
        output: PathBuf,

        /// Also save the pipeline in binary form
        #[arg(long)]
        save_pipeline: Option<PathBuf>,
    },

    /// Run a JSON training config
    Train {
        /// Path to the training config
        config: PathBuf,
    },
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    info!("topoprep v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Preprocess {
            config,
            input,
            shape,
            axes,
            header,
            output,
            save_pipeline,
        } => {
            let pipeline = Pipeline::from_json_file(&config)
                .with_context(|| format!("Failed to load pipeline {:?}", config))?;

            let options = CsvOptions::default().with_header(header);
            let dataset = DenseDesignMatrix::from_csv(&input, &options)
                .with_context(|| format!("Failed to read {:?}", input))?;
            let converter = match axes {
                Some(axes) => DefaultViewConverter::new(shape, axes)?,
                None => DefaultViewConverter::canonical(shape)?,
            };
            let mut dataset =
                DenseDesignMatrix::with_view_converter(dataset.design_matrix().clone(), converter)
                    .context("Input does not match --shape")?;

            info!(
                steps = pipeline.len(),
                examples = dataset.num_examples(),
                "Applying pipeline"
            );
            dataset.apply_preprocessor(&pipeline)?;

            dataset
                .to_csv(&output)
                .with_context(|| format!("Failed to write {:?}", output))?;
            info!(
                examples = dataset.num_examples(),
                features = dataset.num_features(),
                "Wrote {:?}",
                output
            );

            if let Some(path) = save_pipeline {
                pipeline.save_to_file(&path)?;
                info!("Saved pipeline to {:?}", path);
            }
            Ok(())
        }

        Commands::Train { config } => {
            let mut train = load_train_file(&config)
                .with_context(|| format!("Failed to load training config {:?}", config))?;
            train.main_loop().context("Training failed")?;

            if let Some(last) = train.monitor().last() {
                info!(epochs = train.monitor().len(), objective = *last, "Training finished");
            }
            Ok(())
        }
    }
}
