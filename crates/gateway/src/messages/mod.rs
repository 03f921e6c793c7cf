//! Wire message types exchanged with the adapter
//!
//! Normalized formats for the streaming feed (L2 updates, trades) and the
//! order REST surface (requests, acks, state, fills).

pub mod market_data;
pub mod order;

pub use market_data::{BookLevel, L2Update, MarketEvent, TradeMessage};
pub use order::{FillEvent, OrderAck, OrderRequest, OrderState};
