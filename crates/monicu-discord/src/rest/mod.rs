//! REST query surface and image probe

mod api;
mod client;
mod probe;

pub use api::DiscordApi;
pub use client::RestClient;
pub use probe::{HttpImageProbe, ImageProbe};

/// Largest page the paginated endpoints return
pub const REST_PAGE_LIMIT: u8 = 100;
