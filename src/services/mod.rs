pub mod link_service;

pub use link_service::{
    CreateLinkRequest, LinkCreateResult, LinkStats, Redirect, ShortUrlService, Visit,
};
