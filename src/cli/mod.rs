//! CLI module - Command-line interface for Novaterra
//!
//! This module provides a structured CLI using clap for argument parsing.

use clap::{Parser, Subcommand, ValueEnum};

use crate::services::HashAlgorithm;

/// Novaterra - credential service for the Novaterra information hub
#[derive(Parser)]
#[command(name = "novaterra")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    #[command(alias = "daemon")]
    Serve,

    /// Print a password hash suitable for the users or gm_accounts tables
    HashPassword {
        /// Plain-text password to hash
        password: String,

        /// Hash scheme to use
        #[arg(long, value_enum, default_value_t = Algorithm::Bcrypt)]
        algorithm: Algorithm,
    },

    /// Create a default config.toml in the current directory
    Init,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Algorithm {
    Bcrypt,
    Argon2,
}

impl From<Algorithm> for HashAlgorithm {
    fn from(value: Algorithm) -> Self {
        match value {
            Algorithm::Bcrypt => Self::Bcrypt,
            Algorithm::Argon2 => Self::Argon2,
        }
    }
}
