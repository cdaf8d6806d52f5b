pub mod account;
pub mod catalog;
pub mod education;
pub mod membership;
pub mod order;
pub mod profile;
pub mod record;
pub mod registration;
pub mod repository;
