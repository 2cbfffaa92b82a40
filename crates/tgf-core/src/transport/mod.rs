//! Transport abstraction (Telegram today; the engine only sees this port).

pub mod port;
pub mod types;
