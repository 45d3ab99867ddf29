pub mod chat;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod sonarr;

pub use routes::create_router;
