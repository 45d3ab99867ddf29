pub mod api;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod logging;
pub mod metrics;
pub mod shell;
pub mod state;
