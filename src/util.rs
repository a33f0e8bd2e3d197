use chrono::{Duration, NaiveDate, Utc};
use chrono_tz::America::New_York;
use crate::errors::{Result, DataHubError};

/// 交易所当地时间的今天（纽约时区，已归一化为日期）
pub fn exchange_today() -> NaiveDate {
    Utc::now().with_timezone(&New_York).date_naive()
}

/// `today - days`；超出日期可表示范围时返回配置错误
pub fn window_start(today: NaiveDate, days: u32) -> Result<NaiveDate> {
    today
        .checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| DataHubError::ConfigError(format!(
            "{} days before {} is outside the supported date range", days, today
        )))
}

/// 从 `today - days` 开始逐日生成候选日期，默认不含 today
pub fn date_range(today: NaiveDate, days: u32, include_today: bool) -> Result<impl Iterator<Item = NaiveDate>> {
    let start = window_start(today, days)?;
    Ok(start
        .iter_days()
        .take_while(move |d| if include_today { *d <= today } else { *d < today }))
}

/// Daily artifact name, e.g. `sp500_data_2024-03-15.csv`.
pub fn artifact_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.csv", prefix, date.format("%Y-%m-%d"))
}

pub fn snapshot_name(prefix: &str) -> String {
    format!("{}.csv", prefix)
}

// CSV序列化工具
pub mod csv_utils {
    use super::*;
    use crate::models::price::PriceTable;
    use log::debug;

    pub const CSV_HEADER: [&str; 7] = ["date", "open", "high", "low", "close", "volume", "ticker"];

    /// 将行情表序列化为内存中的CSV，写入方一次性拿到完整内容
    pub fn table_to_csv(table: &PriceTable) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        if table.is_empty() {
            writer.write_record(CSV_HEADER)?;
        }
        for row in table.rows() {
            writer.serialize(row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DataHubError::DataError(e.to_string()))?;
        debug!("Serialized {} rows into {} bytes of CSV", table.len(), bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::csv_utils::table_to_csv;
    use crate::models::price::{PriceRow, PriceTable};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_excludes_today_by_default() {
        // 2024-03-13 is a Wednesday
        let dates: Vec<_> = date_range(ymd(2024, 3, 13), 5, false).unwrap().collect();
        assert_eq!(
            dates,
            vec![ymd(2024, 3, 8), ymd(2024, 3, 9), ymd(2024, 3, 10), ymd(2024, 3, 11), ymd(2024, 3, 12)]
        );
    }

    #[test]
    fn date_range_can_include_today() {
        let dates: Vec<_> = date_range(ymd(2024, 3, 13), 2, true).unwrap().collect();
        assert_eq!(dates, vec![ymd(2024, 3, 11), ymd(2024, 3, 12), ymd(2024, 3, 13)]);
    }

    #[test]
    fn date_range_crosses_month_boundary() {
        let dates: Vec<_> = date_range(ymd(2024, 3, 2), 3, false).unwrap().collect();
        assert_eq!(dates, vec![ymd(2024, 2, 28), ymd(2024, 2, 29), ymd(2024, 3, 1)]);
    }

    #[test]
    fn oversized_day_count_is_a_config_error() {
        let err = date_range(ymd(2024, 3, 13), 100_000_000, false).err().unwrap();
        assert!(matches!(err, DataHubError::ConfigError(_)));
        assert!(window_start(ymd(2024, 3, 13), u32::MAX).is_err());
        assert_eq!(window_start(ymd(2024, 3, 13), 366).unwrap(), ymd(2023, 3, 13));
    }

    #[test]
    fn artifact_name_is_deterministic() {
        let date = ymd(2024, 1, 5);
        assert_eq!(artifact_name("sp500_data", date), "sp500_data_2024-01-05.csv");
        assert_eq!(artifact_name("sp500_data", date), artifact_name("sp500_data", ymd(2024, 1, 5)));
        assert_eq!(snapshot_name("sp500_data"), "sp500_data.csv");
    }

    #[test]
    fn serializes_table_with_header() {
        let table = PriceTable::new(vec![
            PriceRow {
                date: ymd(2024, 3, 12),
                open: 173.5,
                high: 174.25,
                low: 172.5,
                close: 173.75,
                volume: 59_825_400,
                ticker: "AAPL".to_string(),
            },
            PriceRow {
                date: ymd(2024, 3, 12),
                open: 407.5,
                high: 415.5,
                low: 406.25,
                close: 415.25,
                volume: 22_457_000,
                ticker: "MSFT".to_string(),
            },
        ]);

        let csv = String::from_utf8(table_to_csv(&table).unwrap()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "date,open,high,low,close,volume,ticker");
        assert_eq!(lines[1], "2024-03-12,173.5,174.25,172.5,173.75,59825400,AAPL");
        assert_eq!(lines[2], "2024-03-12,407.5,415.5,406.25,415.25,22457000,MSFT");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_table_serializes_header_only() {
        let csv = String::from_utf8(table_to_csv(&PriceTable::default()).unwrap()).unwrap();
        assert_eq!(csv.trim_end(), "date,open,high,low,close,volume,ticker");
    }
}
