//! Hermes Runner
//!
//! Wires the whole engine together and drives it:
//!
//! - **Config**: typed JSON configuration with validation
//! - **Engine**: builds every component, spawns the market data hub and
//!   one cooperative trading loop per symbol, owns graceful shutdown
//! - **TradingLoop**: the per-symbol sequencer (snapshot -> signals ->
//!   classify -> size -> risk -> execute -> account)
//!
//! ```text
//! adapter stream ──► MarketDataHub ──► watch<MarketSnapshot>
//!                                          │ (per symbol)
//!                                          ▼
//!                                    TradingLoop ──► RiskGate ──► HybridExecutor
//!                                          │                          │
//!                                          ▼                          ▼
//!                       FillRateMonitor + PnlAttributor + PositionManager
//! ```

pub mod config;
pub mod engine;
pub mod logging;
pub mod trading_loop;

pub use config::{ConfigError, EngineConfig, ExecutionStrategy};
pub use engine::Engine;
pub use trading_loop::TradingLoop;
