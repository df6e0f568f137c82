//! adwatch — ads insight discovery, normalization and threshold rule checks.
//!
//! Main entry point: loads configuration, wires the ads client, rule store
//! and event sink, then runs the requested command.

use adwatch_api::{ApiServer, AppState};
use adwatch_core::config::AppConfig;
use adwatch_core::event_bus::JsonLinesSink;
use adwatch_core::insight::{BreakdownMode, DEFAULT_INSIGHT_FIELDS};
use adwatch_core::types::{MetricField, TimeRange};
use adwatch_integrations::{load_fixture, AdsClient, ClientSession, RuleStore, StaticRuleStore};
use adwatch_reporting::{InsightNormalizer, ResourceTreeWalker};
use adwatch_rules::RuleEvaluator;
use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "adwatch")]
#[command(about = "Ads insight normalization and threshold rule checks")]
#[command(version)]
struct Cli {
    /// TOML config file, layered under ADWATCH__* environment variables
    #[arg(short, long, env = "ADWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Ads snapshot served instead of a live client (overrides config)
    #[arg(long, env = "ADWATCH__ADS__FIXTURE_PATH")]
    fixture: Option<String>,

    /// JSON rules file (overrides config)
    #[arg(long, env = "ADWATCH__RULES__RULES_PATH")]
    rules: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every account, campaign, ad set and ad as an insight target
    Targets,

    /// Fetch normalized insights for one target token, e.g. campaign/123
    Insights {
        token: String,

        /// First day, YYYY-MM-DD (default: seven days ago)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Last day, YYYY-MM-DD (default: today)
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Comma-separated metric fields
        #[arg(long, value_delimiter = ',')]
        fields: Vec<MetricField>,

        /// Aggregate by action type instead of per day
        #[arg(long, default_value_t = false)]
        breakdown: bool,
    },

    /// Run one rule check pass; events are written to stdout as JSON lines
    Check,

    /// Fetch default insights for every target and log the outcome
    Smoke,

    /// Serve the HTTP API and check rules periodically
    Serve {
        /// HTTP port (overrides config)
        #[arg(long, env = "ADWATCH__API__HTTP_PORT")]
        http_port: Option<u16>,

        /// Seconds between rule check passes (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adwatch=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_from(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(fixture) = cli.fixture {
        config.ads.fixture_path = Some(fixture);
    }
    if let Some(rules) = cli.rules {
        config.rules.rules_path = Some(rules);
    }

    info!(
        node_id = %config.node_id,
        ad_user = %config.ads.ad_user,
        api_version = %config.ads.api_version,
        "Configuration loaded"
    );

    let client = build_client(&config)?;
    let session = ClientSession::new(config.ads.service(), config.ads.api_version.clone());
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Targets => {
            let targets = walker(&config, client, session).list_all_insight_targets()?;
            println!("{}", serde_json::to_string_pretty(&targets)?);
        }
        Commands::Insights {
            token,
            since,
            until,
            fields,
            breakdown,
        } => {
            let range = match (since, until) {
                (None, None) => None,
                (since, until) => {
                    let until = until.unwrap_or(today);
                    let since = since.unwrap_or_else(|| TimeRange::last_week(until).since());
                    Some(TimeRange::new(since, until)?)
                }
            };
            let result = InsightNormalizer::new(client).fetch_insights(
                &session,
                &token,
                range,
                Some(fields),
                BreakdownMode::from_flag(breakdown),
                today,
            )?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Check => {
            let store = build_rule_store(&config)?;
            let evaluator = RuleEvaluator::new(
                client,
                store,
                Arc::new(JsonLinesSink::stdout()),
                config.rules.trigger_kind.clone(),
            )
            .with_api_version(config.ads.api_version.clone());
            let report = tokio::task::spawn_blocking(move || evaluator.run_pass()).await??;
            info!(
                events = report.events.len(),
                failures = report.failures.len(),
                "Rule check pass finished"
            );
            if !report.failures.is_empty() {
                bail!("{} rule(s) failed to evaluate", report.failures.len());
            }
        }
        Commands::Smoke => smoke(&config, client, session, today)?,
        Commands::Serve {
            http_port,
            interval,
        } => {
            if let Some(port) = http_port {
                config.api.http_port = port;
            }
            if let Some(secs) = interval {
                config.rules.check_interval_secs = secs;
            }
            serve(config, client, session).await?;
        }
    }

    Ok(())
}

fn build_client(config: &AppConfig) -> anyhow::Result<Arc<dyn AdsClient>> {
    match &config.ads.fixture_path {
        Some(path) => Ok(Arc::new(load_fixture(path)?)),
        None => bail!(
            "no ads client configured: set ads.fixture_path (ADWATCH__ADS__FIXTURE_PATH) or pass --fixture"
        ),
    }
}

fn build_rule_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RuleStore>> {
    match &config.rules.rules_path {
        Some(path) => Ok(Arc::new(StaticRuleStore::load(path)?)),
        None => {
            warn!("No rules file configured, rule checks will find no rules");
            Ok(Arc::new(StaticRuleStore::new()))
        }
    }
}

fn walker(
    config: &AppConfig,
    client: Arc<dyn AdsClient>,
    session: ClientSession,
) -> ResourceTreeWalker {
    ResourceTreeWalker::new(client, session)
        .with_ad_user(config.ads.ad_user.clone())
        .with_legacy_ad_leaf(config.ads.legacy_ad_leaf_entries)
}

fn smoke(
    config: &AppConfig,
    client: Arc<dyn AdsClient>,
    session: ClientSession,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let targets = walker(config, client.clone(), session.clone()).list_all_insight_targets()?;
    let normalizer = InsightNormalizer::new(client);
    let mut failed = 0usize;
    for target in &targets {
        match normalizer.fetch_insights(
            &session,
            &target.value,
            None,
            None,
            BreakdownMode::TimeSeries,
            today,
        ) {
            Ok(result) => info!(
                resource = %target.value,
                name = %target.name,
                empty = result.is_empty(),
                result = %serde_json::to_string(&result)?,
                "Fetched insights"
            ),
            Err(e) => {
                failed += 1;
                warn!(resource = %target.value, error = %e, "Insight fetch failed");
            }
        }
    }
    info!(
        targets = targets.len(),
        failed,
        fields = %DEFAULT_INSIGHT_FIELDS.join(","),
        "Smoke run finished"
    );
    Ok(())
}

async fn serve(
    config: AppConfig,
    client: Arc<dyn AdsClient>,
    session: ClientSession,
) -> anyhow::Result<()> {
    let store = build_rule_store(&config)?;
    let cancel = Arc::new(AtomicBool::new(false));
    let evaluator = Arc::new(
        RuleEvaluator::new(
            client.clone(),
            store,
            Arc::new(JsonLinesSink::stdout()),
            config.rules.trigger_kind.clone(),
        )
        .with_api_version(config.ads.api_version.clone())
        .with_cancel_flag(cancel.clone()),
    );

    let state = AppState {
        client,
        evaluator: evaluator.clone(),
        default_session: session,
        ad_user: config.ads.ad_user.clone(),
        legacy_ad_leaf: config.ads.legacy_ad_leaf_entries,
        node_id: config.node_id.clone(),
        start_time: Instant::now(),
    };
    let api_server = ApiServer::new(config.clone(), state);

    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    // Periodic rule checks
    let interval_secs = config.rules.check_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let evaluator = evaluator.clone();
            match tokio::task::spawn_blocking(move || evaluator.run_pass()).await {
                Ok(Ok(report)) => info!(
                    events = report.events.len(),
                    failures = report.failures.len(),
                    aborted = report.aborted,
                    "Rule check pass finished"
                ),
                Ok(Err(e)) => error!(error = %e, "Rule check pass failed"),
                Err(e) => error!(error = %e, "Rule check task panicked"),
            }
        }
    });

    info!(
        interval_secs,
        "adwatch is serving; rule checks scheduled"
    );

    tokio::select! {
        served = api_server.start_http() => served.context("HTTP server stopped")?,
        _ = wait_for_shutdown(tokio::signal::ctrl_c()) => {
            info!("Shutdown requested");
            cancel.store(true, Ordering::Relaxed);
        }
    }
    Ok(())
}

/// Resolves once `signal` fires. A signal handler that cannot be installed
/// never resolves, so the server keeps running.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!(error = %e, "Failed to install shutdown signal handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_waits_on_signal() {
        let fired = tokio::time::timeout(
            Duration::from_millis(50),
            wait_for_shutdown(async { Ok::<(), std::io::Error>(()) }),
        )
        .await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn test_failed_signal_handler_keeps_serving() {
        let fired = tokio::time::timeout(
            Duration::from_millis(50),
            wait_for_shutdown(async { Err(std::io::Error::other("no signal support")) }),
        )
        .await;
        assert!(fired.is_err());
    }

    #[test]
    fn test_cli_parses_insights_flags() {
        let cli = Cli::try_parse_from([
            "adwatch",
            "insights",
            "campaign/1",
            "--since",
            "2024-05-01",
            "--fields",
            "ctr,impressions",
            "--breakdown",
        ])
        .unwrap();
        match cli.command {
            Commands::Insights {
                token,
                since,
                until,
                fields,
                breakdown,
            } => {
                assert_eq!(token, "campaign/1");
                assert_eq!(since, NaiveDate::from_ymd_opt(2024, 5, 1));
                assert!(until.is_none());
                assert_eq!(fields, vec!["ctr", "impressions"]);
                assert!(breakdown);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
