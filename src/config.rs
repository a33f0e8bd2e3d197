/// 默认股票代码集合（S&P 500 子集）
pub const DEFAULT_TICKERS: [&str; 5] = ["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA"];

pub struct Config {
    pub tickers: Vec<String>,
    pub days: u32,
    pub include_today: bool,
    pub file_prefix: String,
    pub request_timeout_secs: u64,
    pub min_request_interval_ms: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            days: 5,
            include_today: false,
            file_prefix: "sp500_data".to_string(),
            request_timeout_secs: 30,
            min_request_interval_ms: 500,
        }
    }

    pub fn with_tickers(mut self, tickers: Vec<String>) -> Self {
        self.tickers = tickers;
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    // 是否把今天也算进日期区间
    pub fn with_include_today(mut self, include_today: bool) -> Self {
        self.include_today = include_today;
        self
    }

    pub fn with_file_prefix(mut self, prefix: &str) -> Self {
        self.file_prefix = prefix.to_string();
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_min_request_interval_ms(mut self, ms: u64) -> Self {
        self.min_request_interval_ms = ms;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析逗号分隔的股票代码列表，去除空白并转为大写，保持原顺序
pub fn parse_tickers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sp500_subset() {
        let config = Config::new();
        assert_eq!(config.tickers, vec!["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA"]);
        assert_eq!(config.days, 5);
        assert!(!config.include_today);
        assert_eq!(config.file_prefix, "sp500_data");
    }

    #[test]
    fn parses_ticker_list_preserving_order() {
        assert_eq!(parse_tickers(" msft, AAPL ,,nvda"), vec!["MSFT", "AAPL", "NVDA"]);
        assert!(parse_tickers(" , ").is_empty());
    }
}
