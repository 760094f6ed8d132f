//! Outbound chat abstraction (Telegram today).

pub mod port;
pub mod types;
