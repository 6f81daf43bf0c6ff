// src/lib.rs

//! LeadHarvest library
//!
//! Turns business-directory pages into deduplicated lead records, enriches
//! them with contact emails from each lead's website, and gates both behind
//! a daily usage quota.

pub mod config;
pub mod dom;
pub mod error;
pub mod host;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;
pub mod utils;
