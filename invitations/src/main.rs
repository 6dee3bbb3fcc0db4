//! Main entry point for a single invitation run
//!
//! Wires the real REST services into the orchestrator and maps the CLI flags
//! onto one run.

use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing::{error, info};

use invitations::{
    services::{RealForum, RealMailingList},
    InvitationResult, Orchestrator, RunOptions, Settings,
};

/// Invite survey respondents to become makerspace members
#[derive(Parser)]
#[command(name = "invitations")]
#[command(about = "Reconcile survey respondents and send the membership invitation campaign")]
pub struct Args {
    /// Show the state of every survey respondent
    #[arg(short, long)]
    pub status: bool,

    /// Run the automation: tag, send the invitation and archive
    #[arg(short, long)]
    pub auto: bool,

    /// Send even on Open Evening day (only together with --auto)
    #[arg(short, long)]
    pub force: bool,

    /// Do not post this run's log to the forum
    #[arg(short, long)]
    pub quiet: bool,

    /// Show the most recent campaign and the calendar's next event
    #[arg(long, visible_alias = "ci")]
    pub campaign_info: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    fn options(&self) -> RunOptions {
        RunOptions {
            status: self.status,
            auto: self.auto,
            force: self.force,
            quiet: self.quiet,
            campaign_info: self.campaign_info,
        }
    }
}

fn build(settings: Settings) -> InvitationResult<Orchestrator<RealMailingList, RealForum>> {
    let mailing_list = RealMailingList::new(settings.mailchimp.clone())?;
    let forum = RealForum::new(settings.discourse.clone())?;
    Orchestrator::new(mailing_list, forum, settings)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let sink = shared::logging::init_tracing_with_level(Some(&args.log_level));

    let options = args.options();
    if !options.any() {
        let _ = Args::command().print_help();
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = match build(settings) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match orchestrator.run(options, &sink).await {
        Ok(archived) => {
            info!("Run finished, {} member(s) archived.", archived.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run terminated: {}", e);
            ExitCode::FAILURE
        }
    }
}
