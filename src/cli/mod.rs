// CLI module - Command line interface
pub mod args;
pub mod commands;
pub mod output;

pub use args::{Args, Operation, OutputFormat, StorageCommand};
pub use commands::{execute_command, StorageOperations};
pub use output::{ConsoleWriter, OutputWriter};
