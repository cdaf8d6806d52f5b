//! Membership Portal API Library
//!
//! Accounts, organizations and their memberships, stored in PostgreSQL.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod state;
