//! Event check-in service.
//!
//! Staff scan or type a participant ID, the service looks it up in the roster
//! and appends a single attendance row per participant. Rosters and the
//! attendance log live behind the store traits in [`stores`]; staff accounts
//! live in a JSON file and are managed by admins through `/api/users`.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod stores;
pub mod web;
