pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pantry")]
#[command(about = "Pantry - recipe search by ingredient", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// Parse the CSV dataset and (re)load the database
    Ingest {
        /// Directory containing the four source files
        #[arg(long, env = "DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Search recipes on a running server
    Search {
        /// Comma-separated ingredient list, e.g. "chili pepper,flour"
        ingredients: String,

        /// Base URL of the server to query
        #[arg(long, env = "PANTRY_SERVER", default_value = "http://localhost:3000")]
        server: String,
    },
}
