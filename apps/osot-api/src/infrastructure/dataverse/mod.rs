//! Client and repository for the low-code data platform's Web API.

pub mod client;
pub mod mapping;
pub mod memory;
pub mod query;
pub mod repository;
pub mod tables;

pub use client::{ClientCredentials, DataverseApi, DataverseClient, DataverseError, TableRef};
pub use memory::InMemoryDataverse;
pub use repository::DataverseRepository;
pub use tables::Table;
