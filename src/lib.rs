pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod records;
