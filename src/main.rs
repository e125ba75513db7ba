#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

mod adfs;
mod aws;
mod cli;
mod client;
mod config;
mod error;
mod login;
mod prompt;
mod roles;
mod saml;

use std::io;
use std::process;

use clap::Parser;
use crossterm::style::Stylize;
use log::LevelFilter;

use cli::Cli;

fn setup_logger(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:5} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for("pum_aws", level)
        .chain(io::stderr())
        .apply()
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logger(cli.verbose) {
        eprintln!("could not set up logging: {}", e);
    }

    openssl_probe::init_ssl_cert_env_vars();

    if let Err(e) = login::command(&cli) {
        debug!("failed with {:?}", e.kind);
        eprintln!("\n{}\n", e.description().red());
        process::exit(1);
    }
}
