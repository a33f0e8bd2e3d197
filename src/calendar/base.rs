use crate::errors::Result;
use chrono::NaiveDate;

/// Base trait for exchange trading calendars
pub trait TradingCalendar {
    /// Get the exchange code this calendar describes
    fn exchange_code(&self) -> &'static str;

    /// Whether the exchange holds a regular session on the given date.
    /// An `Err` means the calendar cannot answer for this date at all.
    fn is_trading_day(&self, date: NaiveDate) -> Result<bool>;
}
