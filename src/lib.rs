//! Query state, URL history sync and search dispatch for the arts listing,
//! plus the in-memory search server it talks to.

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod passport;
pub mod request_body;
pub mod server;
pub mod state;
pub mod store;
pub mod storefront;
pub mod url_sync;
