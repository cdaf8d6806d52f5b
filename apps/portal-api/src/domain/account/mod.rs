#![allow(clippy::module_inception)]

pub mod account;
pub mod value_objects;

pub use account::{validate_full_name, Account};
pub use value_objects::{AccountRole, Email, Password};
