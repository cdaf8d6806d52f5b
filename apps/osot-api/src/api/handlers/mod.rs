pub mod accounts;
pub mod admin;
pub mod auth;
pub mod orders;
pub mod products;
pub mod records;
pub mod registrations;
