pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod integrations;
pub mod middleware;
pub mod repository;
pub mod response;
pub mod services;
