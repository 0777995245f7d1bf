//! Shared utilities for finsight
//!
//! This crate provides common functionality used across the finsight workspace:
//! tracing setup and typed access to environment configuration.

pub mod env;
pub mod logging;

pub use env::{EnvError, env_opt, env_parse, load_dotenv};
pub use logging::{LogFormat, init_tracing};
