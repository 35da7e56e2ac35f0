pub mod client;
pub mod commands;
pub mod comments;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod models;
pub mod session;
pub mod sync;
pub mod tree;
pub mod ui;
pub mod workspace;
