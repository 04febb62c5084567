pub mod link_store;
pub mod models;

pub use link_store::{LinkStore, MemoryLinkStore};
pub use models::{LinkRecord, LinkStatus, MAX_VALIDITY_MINUTES, is_expired, validity_duration};
