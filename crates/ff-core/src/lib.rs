pub mod build_event;
pub mod error;
pub mod io;
pub mod jenkins_api;
pub mod jenkins_config;
pub mod paths;

pub use error::{FfError, Result};
