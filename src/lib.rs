//! stackup: setup and launch wrapper for a multi-container LLM stack
//!
//! Detects docker or podman, verifies the compose version, collects provider
//! credentials into `.env` and hands lifecycle operations to compose.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
