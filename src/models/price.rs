use chrono::NaiveDate;
use serde::Serialize;

/// 单只股票单日的行情数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub ticker: String,
}

/// Rows for one fetch window, ordered by date and then by ticker-set order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    rows: Vec<PriceRow>,
}

impl PriceTable {
    pub fn new(rows: Vec<PriceRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = PriceRow>) {
        self.rows.extend(rows);
    }

    /// 按日期稳定排序，同一日期内保持股票代码的原始顺序
    pub fn sort_by_date(&mut self) {
        self.rows.sort_by_key(|r| r.date);
    }
}

fn serialize_date<S>(date: &NaiveDate, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
}
