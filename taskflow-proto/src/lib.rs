//! Shared wire types for the TaskFlow REST API.

pub mod auth;
pub mod todo;
