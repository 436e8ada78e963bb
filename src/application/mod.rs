//! Application services: published-content reads, admin writes, rendering
//! and syndication over the repository traits.

pub mod admin;
pub mod categories;
pub mod error;
pub mod published;
pub mod render;
pub mod repos;
pub mod syndication;
