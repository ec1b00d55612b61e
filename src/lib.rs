pub mod api;
pub mod config;
pub mod entities;
pub mod middleware;
pub mod services;
