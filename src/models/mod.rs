// src/models/mod.rs

pub mod api_key;
pub mod assessment;
pub mod family;
pub mod result;
pub mod user;
