// ABOUTME: Process execution boundary for the deploy pipeline.
// ABOUTME: Exports the command executor trait, process executor, and ownership helper.

mod command;
mod ownership;

pub use command::{
    CommandExecutor, CommandLine, CommandOutput, CommandSpec, ExecError, ProcessExecutor,
};
pub use ownership::Ownership;
