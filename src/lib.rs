pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod scheduling;
pub mod state;
pub mod store;
