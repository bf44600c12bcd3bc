pub mod apps;
pub mod auth;
pub mod client;
pub mod logs;

pub use client::{HttpClient, HttpOptions};
