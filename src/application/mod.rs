mod application_impl;
pub mod data;
mod output;
mod runtime_config;

pub use application_impl::{Application, ApplicationError};
pub use runtime_config::RuntimeConfig;
