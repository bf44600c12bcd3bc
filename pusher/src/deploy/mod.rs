//! Push orchestration and its building blocks

pub mod artifact;
pub mod fsm;
pub mod health;
pub mod info;
pub mod pusher;
pub mod staging_logs;
pub mod target;
