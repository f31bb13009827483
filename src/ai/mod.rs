pub mod client;
pub mod types;

pub use client::{build_client, ModelClient};
pub use types::*;
