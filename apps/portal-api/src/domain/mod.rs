pub mod account;
pub mod errors;
pub mod organization;
pub mod repositories;

pub use errors::DomainError;
