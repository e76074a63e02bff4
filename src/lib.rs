//! Fetches the Statistics Canada New Housing Price Index table, caches the
//! parsed rows in process, and computes per-geography series statistics
//! (cumulative growth, CAGR, year-over-year change, maximum drawdown).

pub mod cache;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod series;
pub mod stats;
