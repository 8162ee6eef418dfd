//! Command handlers

pub mod config;
pub mod option;
pub mod status;
