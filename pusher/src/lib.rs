//! cfpush Library
//!
//! Push orchestration for Cloud Foundry style platforms.

pub mod app;
pub mod console;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod manifest;
pub mod platform;
pub mod storage;
pub mod utils;
