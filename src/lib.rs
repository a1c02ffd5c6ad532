//! Content analysis relay
//!
//! Accepts text, links and uploaded files, extracts their text, and analyzes it
//! chunk by chunk with Cloudflare Workers AI. When generation fails, a local
//! analyzer and question generator answer instead. Long analyses run as
//! pollable background jobs.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
