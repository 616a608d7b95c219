//! CLI commands for cife

pub mod dispatch;
pub mod extract;
pub mod filter;
pub mod helpers;
pub mod judge;
pub mod metrics;
pub mod rank;
