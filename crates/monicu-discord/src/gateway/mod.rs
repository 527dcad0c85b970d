//! Gateway client
//!
//! Keeps one gateway session alive and forwards decoded events into a bounded
//! channel. Reconnects with capped exponential backoff, resuming the previous
//! session when the gateway allows it.

mod client;
mod session;

pub use client::{GatewayClient, GatewayConfig};
pub use session::{Backoff, ResumeState};
