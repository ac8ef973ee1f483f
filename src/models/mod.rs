//! Domain model module declarations.

pub mod conversation;
pub mod message;
pub mod profile;
