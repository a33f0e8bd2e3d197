pub mod models;
pub mod errors;
pub mod calendar;
pub mod scrapers;
pub mod storage;
pub mod services;
pub mod config;
pub mod util;

// 重新导出常用类型，方便使用
pub use models::price::{PriceRow, PriceTable};
pub use calendar::{base::TradingCalendar, nyse::NyseCalendar};
pub use scrapers::{base::PriceScraper, yahoo::YahooScraper};
pub use storage::{base::ArtifactStore, gcs::GcsStore, local::LocalStore, Target};
pub use services::fetch_service::{Artifact, DayOutcome, FetchService, RunSummary, SkipReason};
pub use config::Config;
pub use errors::{Result, DataHubError};
