use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::{error, info};
use tokio_util::sync::CancellationToken;

use service_monitor_lib::cli::Cli;
use service_monitor_lib::{build_collector, render, MonitorConfig, PollingLoop};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = MonitorConfig::load(cli.config.as_deref(), cli.overrides())
        .context("failed to load configuration")?;
    let collector = build_collector(&config).context("failed to set up collector")?;
    info!(
        "polling {} ({:?}) every {}s",
        collector.target(),
        config.target,
        config.interval
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let output = config.output;
    let mut poller = PollingLoop::new(collector, config.interval);
    poller
        .run(
            |snapshot| match render(snapshot, output) {
                Ok(text) => println!("{}", text),
                Err(err) => error!("failed to render snapshot: {}", err),
            },
            cancel,
        )
        .await;

    if poller.is_one_shot() && poller.failures() > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
