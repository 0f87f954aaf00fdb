// src/handlers/mod.rs

pub mod auth;
pub mod exam;
pub mod progress;
pub mod result;
