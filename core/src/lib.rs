pub mod bigint;
pub mod chain;
pub mod config;
pub mod db;
pub mod error;
pub mod indexer;
pub mod metrics;
pub mod points;
pub mod supervisor;
