//! Transaction fee recommendation oracle.
//!
//! [`FeeOracle`] watches committed blocks and serves a recommended per-unit
//! fee: the configured percentile of the fee rates seen in a window of recent
//! blocks, clamped to configured bounds.

pub mod bootstrap;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod error;
pub mod oracle;
pub mod strategy;
pub mod worker;

pub use bootstrap::{bootstrap, BootstrapOutcome, BootstrapReport};
pub use bridge::{ForwardOutcome, NotificationBridge};
pub use cache::RecommendationCache;
pub use config::{OracleConfig, SampleMode};
pub use error::{OracleError, Result};
pub use oracle::{FeeOracle, OracleStats};
pub use strategy::{BlockPriceStrategy, PriceStrategy, StrategyConfig};
pub use worker::{OracleEvent, WorkerState};
