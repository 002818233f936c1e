//! Streaming indicators used by the bundled strategies.

pub mod ema;

pub use ema::Ema;
