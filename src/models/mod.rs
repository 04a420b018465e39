pub mod chat;
pub mod meeting;
pub mod notification;
pub mod participant;
pub mod user;
