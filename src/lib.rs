#![forbid(unsafe_code)]

//! Education assistant backend.
//!
//! Authenticated chat sessions whose answers are streamed, as server-sent
//! events, from a hosted conversational agent.

pub mod agent;
pub mod auth;
pub mod chat;
pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod persistence;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
