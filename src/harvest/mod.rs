pub mod client;
pub mod error;
pub mod types;

pub use client::HarvestClient;
pub use error::HarvestError;
pub use types::{Credentials, HarvestUser, TimeEntry};
