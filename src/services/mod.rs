// src/services/mod.rs

pub mod profile;
pub mod scoring;
pub mod submission;
pub mod validation;
