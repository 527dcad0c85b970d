//! Gateway protocol definitions
//!
//! Defines the WebSocket protocol including op codes, frames, close codes, and
//! the payloads this client sends.

mod close_codes;
mod intents;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use intents::Intents;
pub use messages::GatewayFrame;
pub use opcodes::{OpCode, UnknownOpCode};
pub use payloads::{HelloPayload, IdentifyPayload, IdentifyProperties, ResumePayload};
