pub mod config;
pub mod logging;

pub mod barrier;
pub mod job;
pub mod producer;
pub mod query;
pub mod registry;
pub mod retry;
