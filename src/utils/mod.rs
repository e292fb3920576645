// src/utils/mod.rs

pub mod api_key;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod response;
