pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod gateway;
pub mod maps;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod roster;
pub mod state;
