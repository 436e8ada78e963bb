//! djpress: a small blog engine built around a schedule-aware published-content cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
