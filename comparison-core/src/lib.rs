pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod observability;
pub mod providers;
pub mod sink;
pub mod storage;
