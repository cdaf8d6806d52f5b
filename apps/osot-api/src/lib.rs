//! OSOT API Library
//!
//! Membership, e-commerce and registration API over the association's
//! low-code data platform.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod services;
pub mod state;
pub mod validation;
