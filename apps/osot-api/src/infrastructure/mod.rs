pub mod cache;
pub mod dataverse;
pub mod mailer;
