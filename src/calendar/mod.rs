pub mod base;
pub mod nyse;
