pub mod app;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod distribution;
pub mod domain;
pub mod error;
pub mod http;
pub mod output;
pub mod providers;
pub mod query;
pub mod resolver;
pub mod store;
