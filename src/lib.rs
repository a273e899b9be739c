//! Personal task tracker: dated tasks, completion, and days-spent bookkeeping
//! behind a terminal UI.

pub mod auth;
pub mod clock;
pub mod config;
pub mod days;
pub mod error;
pub mod store;
pub mod task;
pub mod tracker;
pub mod ui;
pub mod validate;
