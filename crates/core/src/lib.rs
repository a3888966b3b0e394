//! Core utilities for the Meetpoint location convergence engine
//!
//! This crate provides functionality shared by the geo, API client and engine crates:
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **Retry**: async retry with exponential backoff and a circuit breaker
//! - **Configuration**: TOML-based engine settings with validation
//!
//! # Example
//!
//! ```rust,no_run
//! use meetpoint_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! println!("debounce: {:?}", config.settings.suggestions.debounce());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod retry;

pub use error::{Error, ErrorCode, Result, ResultExt, exit_codes};

