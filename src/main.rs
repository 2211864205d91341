//! CardioPredict CLI
//!
//! # Commands
//!
//! - `train` - Fit the scaler and forest from a CSV file and write the artefacts
//! - `serve` - Start the prediction web server
//! - `synth` - Write a synthetic demo dataset

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use cardiopredict::{
    api::{create_router, AppState},
    common::{config::AppCfg, log},
    inference::ServiceContext,
    training::{self, synthetic, FsArtifactRepo},
};

/// Heart-disease risk scoring: offline trainer and web service.
#[derive(Parser)]
#[command(name = "cardiopredict")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to $CARDIO_CONFIG)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the model from a labelled CSV file
    Train {
        /// Dataset path
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory the artefacts are written to
        #[arg(short, long)]
        model_dir: Option<PathBuf>,

        /// Name of the label column
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Serve the prediction form and API
    Serve {
        /// Address to bind, e.g. 127.0.0.1:5000
        #[arg(short, long)]
        bind: Option<String>,

        /// Directory the artefacts are read from
        #[arg(short, long)]
        model_dir: Option<PathBuf>,
    },
    /// Write a synthetic labelled dataset for demos
    Synth {
        /// Output CSV path
        #[arg(short, long, default_value = "heart.csv")]
        out: PathBuf,

        /// Number of patients
        #[arg(short, long, default_value = "303")]
        rows: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

fn load_cfg(path: Option<PathBuf>) -> Result<AppCfg> {
    match path {
        Some(path) => AppCfg::load_from(Some(path.as_path()))
            .with_context(|| format!("failed loading config {}", path.display())),
        None => AppCfg::load().context("failed loading configuration"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = load_cfg(cli.config)?;

    match cli.command {
        Commands::Train {
            data,
            model_dir,
            label,
        } => {
            if let Some(v) = data {
                cfg.data_path = v;
            }
            if let Some(v) = model_dir {
                cfg.model_dir = v;
            }
            if let Some(v) = label {
                cfg.label_column = v;
            }
            log::init(&cfg.log_filter);

            let repo = FsArtifactRepo::from_cfg(&cfg);
            training::service::run(&cfg, &repo).context("training failed")?;
            Ok(())
        }
        Commands::Serve { bind, model_dir } => {
            if let Some(v) = bind {
                cfg.bind_addr = v;
            }
            if let Some(v) = model_dir {
                cfg.model_dir = v;
            }
            log::init(&cfg.log_filter);
            serve(cfg)
        }
        Commands::Synth { out, rows, seed } => {
            log::init(&cfg.log_filter);
            let dataset = synthetic::patients(rows, seed);
            synthetic::write_csv(&dataset, &out)
                .with_context(|| format!("failed writing {}", out.display()))?;
            info!(path = %out.display(), rows, seed, "synthetic dataset written");
            Ok(())
        }
    }
}

#[tokio::main]
async fn serve(cfg: AppCfg) -> Result<()> {
    let ctx = ServiceContext::load(&FsArtifactRepo::from_cfg(&cfg));
    let app = create_router(AppState::new(ctx));

    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("failed binding {}", cfg.bind_addr))?;
    info!(addr = %cfg.bind_addr, model_dir = %cfg.model_dir.display(), "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}
