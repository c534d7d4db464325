pub mod bot;
pub mod chunker;
pub mod config;
pub mod context;
pub mod data_models;
pub mod error;
pub mod formatter;
pub mod handler;
pub mod wiki;
