pub mod auth;
pub mod cli;
pub mod concourse;
pub mod error;
