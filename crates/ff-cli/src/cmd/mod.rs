pub mod config;
pub mod jenkins;
pub mod listen;
pub mod status;
