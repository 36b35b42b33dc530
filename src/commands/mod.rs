//! CLI subcommand implementations

pub mod init;
