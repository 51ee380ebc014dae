// ABOUTME: Library root for keel - exposes the deploy engine and its collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod hooks;
pub mod install;
pub mod observe;
pub mod output;
pub mod release;
pub mod scm;
pub mod types;
