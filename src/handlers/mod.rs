//! HTTP handlers

pub mod health;
