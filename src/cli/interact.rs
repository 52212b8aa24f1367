//! `click`, `type` and `select` subcommands: open a page, run one action, report.

use std::path::PathBuf;
use std::time::Duration;

use action_primitives::{ActionError, ActionOptions, ActionPrimitives, SelectorCandidates};
use anyhow::{Context, Result};
use cdp_adapter::NavigationWait;
use clap::Args;
use frameweave_cli::config::AppConfig;
use frameweave_cli::diagnostics::capture_snapshot;
use frameweave_cli::{launch_session, BrowserSession};
use tracing::{error, warn};

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct PageArgs {
    /// Page to open before acting
    #[arg(long)]
    pub url: String,

    /// Readiness to wait for after navigation: domcontentloaded or load
    #[arg(long, default_value = "domcontentloaded")]
    pub wait: NavigationWait,
}

#[derive(Args, Clone, Debug)]
pub struct ActionFlags {
    /// Budget for locating the element and, separately, for it to become visible
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Additional attempts after the first (click and type only)
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-key delay for typing, press-to-release hold for clicks
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Write a screenshot and text report when the action fails, into DIR or the
    /// configured diagnostics directory
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    pub snapshot_on_failure: Option<Option<PathBuf>>,
}

impl ActionFlags {
    fn options(&self) -> ActionOptions {
        ActionOptions {
            timeout: self.timeout_ms.map(Duration::from_millis),
            retries: self.retries,
            delay: self.delay_ms.map(Duration::from_millis),
        }
    }

    fn snapshot_dir(&self, config: &AppConfig) -> Option<PathBuf> {
        self.snapshot_on_failure
            .as_ref()
            .map(|dir| dir.clone().unwrap_or_else(|| config.diagnostics.dir.clone()))
    }
}

#[derive(Args, Clone, Debug)]
pub struct ClickArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Candidate selector; repeat to give fallbacks in priority order
    #[arg(long = "selector", required = true)]
    pub selectors: Vec<String>,

    #[command(flatten)]
    pub flags: ActionFlags,
}

#[derive(Args, Clone, Debug)]
pub struct TypeArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Candidate selector; repeat to give fallbacks in priority order
    #[arg(long = "selector", required = true)]
    pub selectors: Vec<String>,

    /// Text that replaces the field's contents
    #[arg(long)]
    pub text: String,

    #[command(flatten)]
    pub flags: ActionFlags,
}

#[derive(Args, Clone, Debug)]
pub struct SelectArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Trigger to click first so the list opens; repeat for fallbacks
    #[arg(long = "selector")]
    pub selectors: Vec<String>,

    /// Visible text (or data-value) of the item to pick
    #[arg(long)]
    pub item: String,

    #[command(flatten)]
    pub flags: ActionFlags,
}

pub async fn cmd_click(args: ClickArgs, ctx: &CliContext) -> Result<()> {
    let candidates = SelectorCandidates::new(args.selectors)?;
    let session = open_page(ctx, &args.page).await?;
    let outcome = session
        .primitives()
        .click_element(&candidates, args.flags.options())
        .await;
    conclude(session, outcome, &args.flags, "click").await
}

pub async fn cmd_type(args: TypeArgs, ctx: &CliContext) -> Result<()> {
    let candidates = SelectorCandidates::new(args.selectors)?;
    let session = open_page(ctx, &args.page).await?;
    let outcome = session
        .primitives()
        .type_into_field(&candidates, &args.text, args.flags.options())
        .await;
    conclude(session, outcome, &args.flags, "type").await
}

pub async fn cmd_select(args: SelectArgs, ctx: &CliContext) -> Result<()> {
    let trigger = if args.selectors.is_empty() {
        None
    } else {
        Some(SelectorCandidates::new(args.selectors)?)
    };
    let session = open_page(ctx, &args.page).await?;
    let primitives = session.primitives();
    let options = args.flags.options();

    let outcome = match &trigger {
        Some(trigger) => match primitives.click_element(trigger, options).await {
            Ok(()) => primitives.select_dropdown_item(&args.item, options).await,
            Err(err) => Err(err),
        },
        None => primitives.select_dropdown_item(&args.item, options).await,
    };
    conclude(session, outcome, &args.flags, "select").await
}

async fn open_page(ctx: &CliContext, page: &PageArgs) -> Result<BrowserSession> {
    let (session, _) = launch_session(ctx.config())
        .await
        .context("failed to start browser session")?;
    if let Err(err) = session
        .goto(&page.url, page.wait, "failed to open target page")
        .await
    {
        session.close().await;
        return Err(err).with_context(|| format!("navigation to {} failed", page.url));
    }
    Ok(session)
}

async fn conclude(
    session: BrowserSession,
    outcome: Result<(), ActionError>,
    flags: &ActionFlags,
    label: &str,
) -> Result<()> {
    let result = match outcome {
        Ok(()) => {
            println!("{label}: ok");
            Ok(())
        }
        Err(err) => {
            error!(kind = err.kind(), error = %err, "{label} failed");
            if let Some(dir) = flags.snapshot_dir(session.config()) {
                match capture_snapshot(session.adapter(), session.page(), &dir, label).await {
                    Ok(files) => println!("snapshot written to {}", files.report.display()),
                    Err(snap_err) => warn!(error = %snap_err, "snapshot capture failed"),
                }
            }
            Err(anyhow::Error::new(err).context(format!("{label} failed")))
        }
    };
    session.close().await;
    result
}
