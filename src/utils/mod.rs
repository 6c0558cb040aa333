pub mod error;
pub mod logger;
pub mod notice;
pub mod validation;
