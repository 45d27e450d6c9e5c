pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod types;
pub mod viewer;

#[cfg(test)]
pub mod testing;
