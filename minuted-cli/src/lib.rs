//! CLI wiring for the pipeline workers: argument parsing, logging setup,
//! signal handling and worker startup.
use clap::{Args, Parser};
use inline_colorization::{color_green, color_red, color_reset};
use std::fs;
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use minuted::config::Config;
use minuted::runtime::{shutdown_channel, Worker};
use minuted::stages::export::ExportStage;
use minuted::stages::report::ReportStage;
use minuted::stages::transcribe::TranscriptionStage;
use minuted::Error;

#[derive(Parser)]
#[command(name = "minuted")]
#[command(bin_name = "minuted")]
enum MinutedCli {
    Lint(LintArgs),
    Run(RunArgs),
}

#[derive(Args)]
#[command(author, version, about, long_about = None)]
struct LintArgs {
    #[arg(short, long)]
    config: Vec<String>,
}

#[derive(clap::ValueEnum, Clone, Default, Debug)]
enum LogLevel {
    #[default]
    Info,
    Debug,
    Trace,
    Error,
    None,
}

#[derive(clap::ValueEnum, Clone, Default, Debug)]
enum StageSelect {
    /// Run all three stage workers in one process
    #[default]
    All,
    /// Transcription worker only
    Transcription,
    /// Report worker only
    Report,
    /// Export worker only
    Export,
}

#[derive(Args)]
#[command(author, version, about, long_about = None)]
struct RunArgs {
    /// Configuration file; the environment is used when omitted
    #[arg(short, long)]
    config: Option<String>,
    #[arg(short, long, value_enum, default_value = "all")]
    stage: StageSelect,
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

/// Entry point used by the binary.
pub async fn run() -> Result<(), Error> {
    match MinutedCli::parse() {
        MinutedCli::Lint(args) => {
            let mut failures: Vec<String> = Vec::new();
            for c in args.config {
                let conf = match fs::read_to_string(&c) {
                    Ok(f) => f,
                    Err(e) => {
                        failures.push(format!("failed {}: {}", c, e));
                        continue;
                    }
                };

                match Config::from_str(&conf) {
                    Ok(config) => {
                        if let Err(e) = config.validate() {
                            failures.push(format!("failed {}: {}", c, e));
                        }
                    }
                    Err(e) => failures.push(format!("failed {}: {}", c, e)),
                };
            }

            if failures.is_empty() {
                println!("{color_green}Configuration is valid{color_reset}");
                process::exit(0)
            };

            for f in failures {
                println!("{color_red}{}{color_reset}", f);
            }

            process::exit(1);
        }
        MinutedCli::Run(args) => {
            setup_subscriber(args.log_level);

            let config = match &args.config {
                Some(path) => {
                    let conf = fs::read_to_string(path).map_err(|e| {
                        Error::ConfigFailedValidation(format!("cannot read {}: {}", path, e))
                    })?;
                    Config::from_str(&conf)?
                }
                None => Config::from_env(),
            };
            config.validate()?;
            let config = Arc::new(config);

            let ports = minuted::modules::aws::build_ports(&config).await?;

            let mut shutdown_senders = Vec::new();
            let mut workers: Vec<
                std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), Error>>>>,
            > = Vec::new();

            if matches!(args.stage, StageSelect::All | StageSelect::Transcription) {
                let (tx, rx) = shutdown_channel();
                shutdown_senders.push(tx);
                let worker = Worker::new(
                    TranscriptionStage::new(ports.clone(), config.clone()),
                    rx,
                );
                workers.push(Box::pin(async move { worker.run().await }));
            }
            if matches!(args.stage, StageSelect::All | StageSelect::Report) {
                let (tx, rx) = shutdown_channel();
                shutdown_senders.push(tx);
                let worker = Worker::new(ReportStage::new(ports.clone(), config.clone()), rx);
                workers.push(Box::pin(async move { worker.run().await }));
            }
            if matches!(args.stage, StageSelect::All | StageSelect::Export) {
                let (tx, rx) = shutdown_channel();
                shutdown_senders.push(tx);
                let worker = Worker::new(ExportStage::new(ports.clone(), config.clone()), rx);
                workers.push(Box::pin(async move { worker.run().await }));
            }

            let _ = tokio::spawn(async move {
                wait_for_signal().await;
                for sender in shutdown_senders {
                    let _ = sender.send(());
                }
            });

            let results = futures::future::join_all(workers).await;
            for r in results {
                r?
            }
            process::exit(0)
        }
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn setup_subscriber(arg_log_level: LogLevel) {
    let log_level = match arg_log_level {
        LogLevel::Debug => Some(LevelFilter::DEBUG),
        LogLevel::Error => Some(LevelFilter::ERROR),
        LogLevel::Info => Some(LevelFilter::INFO),
        LogLevel::Trace => Some(LevelFilter::TRACE),
        LogLevel::None => None,
    };

    if let Some(l) = log_level {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::OFF.into())
            .from_env_lossy()
            .add_directive(format!("minuted={}", l).parse().expect("valid directive"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .json()
            .init();
    };
}
