//! Periodic runner
//!
//! Performs a status + automation run, then sleeps for the configured number
//! of hours, until interrupted with Ctrl+C.

use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use invitations::{
    services::{RealForum, RealMailingList},
    InvitationResult, Orchestrator, RunOptions, Settings,
};
use shared::LogSink;

/// Run the invitation automation on a fixed interval
#[derive(Parser)]
#[command(name = "invitations-timer")]
#[command(about = "Run the invitation automation and sleep between runs")]
pub struct Args {
    /// Number of hours to sleep between runs
    #[arg(long, visible_alias = "hrs", default_value_t = 12)]
    pub hours: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// One full run with freshly loaded settings
async fn run_once(
    load_settings: impl FnOnce() -> InvitationResult<Settings>,
    options: RunOptions,
    sink: &LogSink,
) -> anyhow::Result<()> {
    let settings = load_settings().context("loading settings")?;
    let mailing_list = RealMailingList::new(settings.mailchimp.clone())?;
    let forum = RealForum::new(settings.discourse.clone())?;
    let orchestrator = Orchestrator::new(mailing_list, forum, settings)?;
    orchestrator.run(options, sink).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let sink = shared::logging::init_tracing_with_level(Some(&args.log_level));
    let options = RunOptions {
        status: true,
        auto: true,
        ..RunOptions::default()
    };
    let interval = Duration::from_secs(args.hours * 60 * 60);

    loop {
        // Settings are re-read each run so .env edits apply without a restart
        if let Err(e) = run_once(Settings::from_env, options, &sink).await {
            error!("Run terminated: {:#}", e);
        }

        info!("Sleeping for {} hours...", args.hours);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = signal::ctrl_c() => {
                result.context("listening for Ctrl+C")?;
                info!("Timer interrupted via Ctrl+C. Exiting...");
                return Ok(());
            }
        }
    }
}
