use crate::calendar::base::TradingCalendar;
use crate::config::Config;
use crate::errors::{Result, DataHubError};
use crate::scrapers::base::PriceScraper;
use crate::storage::base::ArtifactStore;
use crate::util::{self, csv_utils};
use chrono::{Duration, NaiveDate};
use log::{error, info, warn};
use std::fmt;
use std::sync::Arc;

/// 已写入的产出文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub date: NaiveDate,
    pub name: String,
    pub rows: usize,
}

/// Why a candidate date produced no artifact in this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotTradingDay,
    AlreadyExists,
    /// The store could not answer; treated as existing so nothing is overwritten.
    ExistenceCheckFailed(String),
    EmptyFetch,
    FetchFailed(String),
    WriteFailed(String),
}

impl SkipReason {
    /// 是否属于需要关注的失败（而非正常跳过）
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SkipReason::ExistenceCheckFailed(_) | SkipReason::FetchFailed(_) | SkipReason::WriteFailed(_)
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotTradingDay => write!(f, "market closed"),
            SkipReason::AlreadyExists => write!(f, "already exists"),
            SkipReason::ExistenceCheckFailed(e) => write!(f, "existence check failed: {}", e),
            SkipReason::EmptyFetch => write!(f, "no data returned"),
            SkipReason::FetchFailed(e) => write!(f, "fetch failed: {}", e),
            SkipReason::WriteFailed(e) => write!(f, "write failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    Written(Artifact),
    Skipped(SkipReason),
}

/// 一次运行的汇总结果
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub written: Vec<Artifact>,
    pub skipped: Vec<(NaiveDate, SkipReason)>,
}

impl RunSummary {
    pub fn candidates(&self) -> usize {
        self.written.len() + self.skipped.len()
    }

    pub fn skipped_because(&self, reason: &SkipReason) -> usize {
        self.skipped.iter().filter(|(_, r)| r == reason).count()
    }

    pub fn failures(&self) -> usize {
        self.skipped.iter().filter(|(_, r)| r.is_failure()).count()
    }

    fn record(&mut self, date: NaiveDate, outcome: DayOutcome) {
        match outcome {
            DayOutcome::Written(artifact) => self.written.push(artifact),
            DayOutcome::Skipped(reason) => self.skipped.push((date, reason)),
        }
    }
}

/// 增量抓取服务：逐个交易日抓取行情并写入目标存储，已存在的日期直接跳过
pub struct FetchService {
    config: Config,
    calendar: Arc<dyn TradingCalendar + Send + Sync>,
    scraper: Arc<dyn PriceScraper + Send + Sync>,
    store: Arc<dyn ArtifactStore + Send + Sync>,
}

impl FetchService {
    pub fn new(
        config: Config,
        calendar: Arc<dyn TradingCalendar + Send + Sync>,
        scraper: Arc<dyn PriceScraper + Send + Sync>,
        store: Arc<dyn ArtifactStore + Send + Sync>,
    ) -> Self {
        Self {
            config,
            calendar,
            scraper,
            store,
        }
    }

    /// Candidate dates in ascending order, generated lazily
    pub fn candidate_dates(&self, today: NaiveDate) -> Result<impl Iterator<Item = NaiveDate>> {
        util::date_range(today, self.config.days, self.config.include_today)
    }

    pub fn artifact_name(&self, date: NaiveDate) -> String {
        util::artifact_name(&self.config.file_prefix, date)
    }

    /// 处理单个日期。只有交易日历查询失败才返回 `Err`，其余失败都记为跳过
    pub async fn process_date(&self, date: NaiveDate) -> Result<DayOutcome> {
        info!("Checking market status for {}", date);
        if !self.calendar.is_trading_day(date)? {
            info!("Skipping {} - {} is closed", date, self.calendar.exchange_code());
            return Ok(DayOutcome::Skipped(SkipReason::NotTradingDay));
        }

        let name = self.artifact_name(date);
        match self.store.exists(&name).await {
            Ok(true) => {
                info!("Data for {} already exists in {}. Skipping.", date, self.store.describe());
                return Ok(DayOutcome::Skipped(SkipReason::AlreadyExists));
            }
            Ok(false) => {}
            Err(e) => {
                error!("Failed to check whether {} exists, skipping {}: {}", name, date, e);
                return Ok(DayOutcome::Skipped(SkipReason::ExistenceCheckFailed(e.to_string())));
            }
        }

        info!("Market is open on {}. Downloading data for {:?}", date, self.config.tickers);
        let table = match self.scraper.fetch(&self.config.tickers, date, date + Duration::days(1)).await {
            Ok(table) => table,
            Err(e) => {
                error!("Failed to download data for {} from {}: {}", date, self.scraper.source_name(), e);
                return Ok(DayOutcome::Skipped(SkipReason::FetchFailed(e.to_string())));
            }
        };

        if table.is_empty() {
            warn!("No data available for {:?} on {}", self.config.tickers, date);
            return Ok(DayOutcome::Skipped(SkipReason::EmptyFetch));
        }

        let written = match csv_utils::table_to_csv(&table) {
            Ok(content) => self.store.write(&name, &content).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => {
                info!("Stored {} rows for {} as {}", table.len(), date, name);
                Ok(DayOutcome::Written(Artifact {
                    date,
                    name,
                    rows: table.len(),
                }))
            }
            Err(e) => {
                error!("Failed to store {} in {}: {}", name, self.store.describe(), e);
                Ok(DayOutcome::Skipped(SkipReason::WriteFailed(e.to_string())))
            }
        }
    }

    /// 按日期升序处理所有候选日期
    pub async fn run(&self, today: NaiveDate) -> Result<RunSummary> {
        info!(
            "Fetching {:?} for the last {} days before {} into {}",
            self.config.tickers,
            self.config.days,
            today,
            self.store.describe()
        );

        let mut summary = RunSummary::default();
        for date in self.candidate_dates(today)? {
            let outcome = self.process_date(date).await?;
            summary.record(date, outcome);
        }

        info!(
            "Run finished: {} candidate days, {} written, {} skipped ({} failed)",
            summary.candidates(),
            summary.written.len(),
            summary.skipped.len(),
            summary.failures()
        );
        Ok(summary)
    }

    pub async fn run_today(&self) -> Result<RunSummary> {
        self.run(util::exchange_today()).await
    }

    /// 一次性下载整个区间并写入单个快照文件（覆盖旧快照）
    pub async fn snapshot(&self, today: NaiveDate) -> Result<Option<Artifact>> {
        let start = util::window_start(today, self.config.days)?;
        let end = if self.config.include_today {
            today.succ_opt().ok_or_else(|| DataHubError::ConfigError(format!("no day after {}", today)))?
        } else {
            today
        };
        info!("Downloading snapshot for {:?} over [{}, {})", self.config.tickers, start, end);

        let table = self.scraper.fetch(&self.config.tickers, start, end).await?;
        let latest = match table.rows().last() {
            Some(row) => row.date,
            None => {
                warn!("No data available for {:?} in [{}, {})", self.config.tickers, start, end);
                return Ok(None);
            }
        };

        let name = util::snapshot_name(&self.config.file_prefix);
        let content = csv_utils::table_to_csv(&table)?;
        self.store.write(&name, &content).await?;

        info!("Snapshot of {} rows stored as {} in {}", table.len(), name, self.store.describe());
        Ok(Some(Artifact {
            date: latest,
            name,
            rows: table.len(),
        }))
    }

    pub async fn snapshot_today(&self) -> Result<Option<Artifact>> {
        self.snapshot(util::exchange_today()).await
    }
}
