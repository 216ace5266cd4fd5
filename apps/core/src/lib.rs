pub mod action_executor;
pub mod config;
pub mod consolidate;
pub mod contract;
pub mod data_store;
pub mod engine;
pub mod executor;
pub mod invocation;
pub mod logging;
pub mod model;
pub mod plugin;
pub mod presenter;
pub mod recoll_plugin;
pub mod recollq;
pub mod runtime;
pub mod transport;
