use gtpterm::error::GtptermError;
use gtpterm::logger::initialize as LoggerInitialize;
use gtpterm::shell;

use common::ErrorLocation;

use std::env::{args, temp_dir};
use std::panic::Location;
use std::process::exit;

use log::info;

const USAGE: &str = "Usage: gtpterm <engine command line>";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{error}");
        exit(1);
    }
}

async fn run() -> Result<(), GtptermError> {
    let arguments: Vec<String> = args().skip(1).collect();

    if arguments.is_empty() {
        return Err(GtptermError::Gtpterm {
            message: String::from(USAGE),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let command_line = arguments.join(" ");

    LoggerInitialize(&temp_dir())?;
    info!("gtpterm starting");

    shell::run(&command_line).await
}
