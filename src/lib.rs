//! Historical price reaction around earnings announcements for a single ticker.
//!
//! `data` talks to the market data provider, `analysis` aligns earnings dates
//! against the daily series and aggregates the moves, `report` renders and
//! exports the result.

pub mod analysis;
pub mod config;
pub mod data;
pub mod report;
