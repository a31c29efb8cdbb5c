pub mod auth;
pub mod debug;
pub mod health;
pub mod participant;
pub mod participants;
pub mod statistics;
pub mod users;
