//! CLI command handlers

pub mod activity;
pub mod report;
pub mod review;
pub mod user;
