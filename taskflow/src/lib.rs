//! `TaskFlow`: personal task tracker client library.

pub mod api;
pub mod commands;
pub mod config;
pub mod notify;
pub mod session;
pub mod store;
pub mod view;
