pub mod allocate;
pub mod cli;
pub mod config;
pub mod discover;
pub mod error;
pub mod file_store;
pub mod partition;
pub mod session;
pub mod tools;
