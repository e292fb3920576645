// src/handlers/mod.rs

pub mod admin;
pub mod assessment;
pub mod auth;
pub mod profile;
pub mod results;
