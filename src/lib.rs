pub mod api;
pub mod cancel;
pub mod canvas;
pub mod config;
pub mod connectivity;
pub mod data_source;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod repository;
pub mod services;
pub mod session;
pub mod state;
