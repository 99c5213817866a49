//! Taskdeck — live-syncing task list client library.

pub mod api;
pub mod config;
pub mod live;
pub mod session;
pub mod store;
