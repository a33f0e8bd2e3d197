use sp500_datahub::calendar::base::TradingCalendar;
use sp500_datahub::calendar::nyse::NyseCalendar;
use sp500_datahub::config::{self, Config};
use sp500_datahub::errors::DataHubError;
use sp500_datahub::scrapers::base::PriceScraper;
use sp500_datahub::scrapers::yahoo::YahooScraper;
use sp500_datahub::services::fetch_service::FetchService;
use sp500_datahub::storage::base::ArtifactStore;
use sp500_datahub::storage::gcs::GcsStore;
use sp500_datahub::storage::local::LocalStore;
use sp500_datahub::storage::Target;

use anyhow::Context;
use clap::{App, Arg, ArgGroup, ArgMatches, SubCommand};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

const GCS_TOKEN_ENV: &str = "GCS_ACCESS_TOKEN";

// fetch 和 snapshot 共用的参数
fn target_args<'a>(cmd: App<'a>) -> App<'a> {
    cmd.arg(
        Arg::with_name("days")
            .long("days")
            .value_name("DAYS")
            .help("Number of past calendar days to cover")
            .takes_value(true)
            .default_value("5"),
    )
    .arg(
        Arg::with_name("tickers")
            .short('t')
            .long("tickers")
            .value_name("TICKERS")
            .help("Comma-separated ticker symbols (default: AAPL,MSFT,GOOGL,AMZN,TSLA)")
            .takes_value(true),
    )
    .arg(
        Arg::with_name("local")
            .long("local")
            .value_name("DIR")
            .help("Directory to save the data locally")
            .takes_value(true)
            .conflicts_with("bucket"),
    )
    .arg(
        Arg::with_name("bucket")
            .long("bucket")
            .value_name("BUCKET")
            .help("Google Cloud Storage bucket name")
            .takes_value(true),
    )
    .arg(
        Arg::with_name("prefix")
            .long("prefix")
            .value_name("PREFIX")
            .help("Object name prefix inside the bucket")
            .takes_value(true)
            .requires("bucket"),
    )
    .arg(
        Arg::with_name("gcs-token")
            .long("gcs-token")
            .value_name("TOKEN")
            .help(
                "OAuth2 access token for GCS (falls back to GCS_ACCESS_TOKEN). \
                 Access tokens are short-lived and usually expire after one hour, \
                 so pass a fresh one per run; service account key files are not read",
            )
            .takes_value(true)
            .requires("bucket"),
    )
    .arg(
        Arg::with_name("include-today")
            .long("include-today")
            .help(
                "Also cover today's date. Run after the close: a bar fetched during \
                 market hours is partial, and once stored it is skipped by later runs \
                 instead of being refreshed",
            )
            .takes_value(false),
    )
    .group(ArgGroup::with_name("target").args(&["local", "bucket"]).required(true))
}

fn build_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let days = matches.value_of("days")
        .unwrap_or("5")
        .parse::<u32>()
        .context("--days must be a positive integer")?;
    if days == 0 {
        return Err(DataHubError::ConfigError("--days must be a positive integer".to_string()).into());
    }

    let mut config = Config::new()
        .with_days(days)
        .with_include_today(matches.is_present("include-today"));

    if let Some(raw) = matches.value_of("tickers") {
        let tickers = config::parse_tickers(raw);
        if tickers.is_empty() {
            return Err(DataHubError::ConfigError("--tickers contains no symbols".to_string()).into());
        }
        config = config.with_tickers(tickers);
    }

    Ok(config)
}

fn build_store(target: &Target, matches: &ArgMatches, config: &Config) -> anyhow::Result<Arc<dyn ArtifactStore + Send + Sync>> {
    let store: Arc<dyn ArtifactStore + Send + Sync> = match target {
        Target::Local { dir } => Arc::new(LocalStore::new(dir.clone())),
        Target::Gcs { bucket, prefix } => {
            let token = match matches.value_of("gcs-token") {
                Some(token) => token.to_string(),
                None => std::env::var(GCS_TOKEN_ENV).unwrap_or_default(),
            };
            Arc::new(GcsStore::new(
                bucket,
                prefix,
                &token,
                Duration::from_secs(config.request_timeout_secs),
            )?)
        }
    };
    Ok(store)
}

fn build_service(matches: &ArgMatches) -> anyhow::Result<FetchService> {
    let config = build_config(matches)?;
    // 在任何网络请求之前校验存储目标
    let target = Target::from_args(
        matches.value_of("local"),
        matches.value_of("bucket"),
        matches.value_of("prefix"),
    )?;
    info!("Storage target: {}", target);

    let store = build_store(&target, matches, &config)?;
    let calendar: Arc<dyn TradingCalendar + Send + Sync> = Arc::new(NyseCalendar::new());
    let scraper: Arc<dyn PriceScraper + Send + Sync> = Arc::new(YahooScraper::new(
        Duration::from_secs(config.request_timeout_secs),
        Duration::from_millis(config.min_request_interval_ms),
    )?);

    Ok(FetchService::new(config, calendar, scraper, store))
}

fn build_app() -> App<'static> {
    App::new("sp500_datahub")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Download S&P 500 data and store it locally or in Google Cloud Storage")
        .subcommand(target_args(
            SubCommand::with_name("fetch")
                .about("Fetch one CSV per NYSE trading day, skipping days already stored"),
        ))
        .subcommand(target_args(
            SubCommand::with_name("snapshot")
                .about("Download the whole window into a single sp500_data.csv"),
        ))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = build_app().get_matches();

    if let Some(matches) = matches.subcommand_matches("fetch") {
        let service = build_service(matches)?;
        let summary = service.run_today().await?;
        for artifact in &summary.written {
            info!("  + {} ({} rows)", artifact.name, artifact.rows);
        }
        for (date, reason) in summary.skipped.iter().filter(|(_, r)| r.is_failure()) {
            warn!("  ! {}: {}", date, reason);
        }
    } else if let Some(matches) = matches.subcommand_matches("snapshot") {
        let service = build_service(matches)?;
        match service.snapshot_today().await? {
            Some(artifact) => info!("Snapshot {} written with {} rows", artifact.name, artifact.rows),
            None => warn!("Snapshot not written: provider returned no data"),
        }
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_help() -> String {
        let mut out = Vec::new();
        target_args(App::new("fetch")).write_long_help(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn gcs_token_help_mentions_expiry() {
        let help = long_help();
        assert!(help.contains("expire"));
        assert!(help.contains("GCS_ACCESS_TOKEN"));
    }

    #[test]
    fn include_today_help_warns_about_partial_bars() {
        let help = long_help();
        assert!(help.contains("partial"));
        assert!(help.contains("refreshed"));
    }

    #[test]
    fn exactly_one_target_is_accepted() {
        let both = build_app().try_get_matches_from(vec![
            "sp500_datahub", "fetch", "--local", "data", "--bucket", "my-bucket",
        ]);
        assert!(both.is_err());

        let neither = build_app().try_get_matches_from(vec!["sp500_datahub", "fetch"]);
        assert!(neither.is_err());

        let matches = build_app()
            .try_get_matches_from(vec!["sp500_datahub", "snapshot", "--bucket", "my-bucket", "--prefix", "daily"])
            .unwrap();
        let sub = matches.subcommand_matches("snapshot").unwrap();
        assert_eq!(sub.value_of("prefix"), Some("daily"));
    }

    #[test]
    fn zero_days_is_rejected() {
        let matches = build_app()
            .try_get_matches_from(vec!["sp500_datahub", "fetch", "--local", "data", "--days", "0"])
            .unwrap();
        let sub = matches.subcommand_matches("fetch").unwrap();
        assert!(build_config(sub).is_err());
    }
}
