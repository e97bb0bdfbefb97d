pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod geo;
pub mod info;
pub mod input;
pub mod layout;
pub mod listing;
pub mod mirror;
pub mod output;
