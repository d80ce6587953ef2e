//! # tournament-registry-api
//!
//! The wire contract of the tournament registry: typed ids and the request
//! and response payloads exchanged with the server. The match model itself
//! lives in `tournament-registry-core` and is re-used here unchanged.

pub mod admins;
pub mod auth;
pub mod id;
pub mod matches;
pub mod settings;
pub mod teams;
