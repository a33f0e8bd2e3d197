use crate::models::price::{PriceRow, PriceTable};
use crate::errors::{Result, DataHubError};
use crate::scrapers::base::PriceScraper;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::America::New_York;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use log::{debug, info, warn};

const CHART_ENDPOINT: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance 日线数据抓取器
pub struct YahooScraper {
    client: Client,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl YahooScraper {
    pub fn new(timeout: Duration, min_interval: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(DataHubError::RequestError)?;

        Ok(Self {
            client,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// 等待请求频率限制
    async fn wait_for_rate_limit(&self) {
        let now = Instant::now();
        let should_wait = {
            let mut last = self.last_request.lock().unwrap();
            let should_wait = (*last)
                .map(|instant| instant.elapsed())
                .filter(|elapsed| *elapsed < self.min_interval)
                .map(|elapsed| self.min_interval - elapsed);
            *last = Some(now);
            should_wait
        };

        if let Some(wait_time) = should_wait {
            debug!("Waiting {:?} to respect the request interval", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }

    fn chart_url(ticker: &str) -> String {
        format!("{}/{}", CHART_ENDPOINT, urlencoding::encode(ticker))
    }

    async fn fetch_ticker(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceRow>> {
        self.wait_for_rate_limit().await;

        let period1 = utc_midnight(start);
        let period2 = utc_midnight(end);
        debug!("Requesting {} bars for {} ({} - {})", self.source_name(), ticker, start, end);

        let response = self.client
            .get(Self::chart_url(ticker))
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(DataHubError::ProviderError(format!(
                "HTTP {} while fetching {}", status, ticker
            )));
        }

        parse_chart(ticker, &text, start, end)
    }
}

#[async_trait]
impl PriceScraper for YahooScraper {
    fn source_name(&self) -> &'static str {
        "Yahoo"
    }

    async fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> Result<PriceTable> {
        info!("Fetching {} tickers from {} for [{}, {})", tickers.len(), self.source_name(), start, end);

        let mut table = PriceTable::default();
        for ticker in tickers {
            let rows = self.fetch_ticker(ticker, start, end).await?;
            if rows.is_empty() {
                warn!("No bars returned for {} in [{}, {})", ticker, start, end);
            }
            table.extend(rows);
        }
        table.sort_by_date();

        debug!("Fetched {} rows", table.len());
        Ok(table)
    }
}

fn utc_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// 解析 chart 接口返回的 JSON，只保留 `[start, end)` 内且有行情的记录
pub(crate) fn parse_chart(ticker: &str, body: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceRow>> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = response.chart.error {
        return Err(DataHubError::ProviderError(format!(
            "{} for {}: {}", err.code, ticker, err.description
        )));
    }

    let data = response.chart.result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| DataHubError::ProviderError(format!("Empty chart result for {}", ticker)))?;

    // 区间内没有交易时接口不返回 timestamp 字段
    let timestamps = match data.timestamp {
        Some(ts) => ts,
        None => return Ok(Vec::new()),
    };

    let quote = data.indicators.quote.into_iter().next()
        .ok_or_else(|| DataHubError::ProviderError(format!("No quote data for {}", ticker)))?;

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.with_timezone(&New_York).date_naive())
            .ok_or_else(|| DataHubError::ProviderError(format!("Invalid timestamp {} for {}", ts, ticker)))?;
        if date < start || date >= end {
            continue;
        }

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none() {
            continue;
        }

        rows.push(PriceRow {
            date,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close: close.unwrap_or(f64::NAN),
            volume: volume.unwrap_or(0),
            ticker: ticker.to_string(),
        });
    }

    Ok(rows)
}
