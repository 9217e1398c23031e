//! Tender notice intake: fetch from the marketplace, normalize, filter, theme, and draft
//! expressions of interest.

pub mod api_types;
pub mod config;
pub mod draft;
pub mod fetch;
pub mod filter;
pub mod gate;
pub mod models;
pub mod normalize;
pub mod server;
pub mod store;
pub mod text;
pub mod themes;
