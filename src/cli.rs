use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser)]
#[command(author, version, long_about = None)]
#[command(
    about = "Get temporary AWS credentials using federated access with privileged users"
)]
pub struct Cli {
    /// Sets the level of verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Sets a custom settings file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Store credentials for a non-default AWS profile
    #[arg(short, long, default_value = "default")]
    pub profile: String,

    /// Filter roles for the given AWS account
    #[arg(short, long)]
    pub account: Option<String>,

    /// Configure the profile for the specified AWS region
    #[arg(short, long, default_value = "eu-west-1")]
    pub region: String,

    /// IdP initiated sign-on URL
    #[arg(long, value_name = "URL")]
    pub idp_url: Option<String>,

    /// Session duration in seconds
    #[arg(short = 'd', long)]
    pub session_duration: Option<i64>,

    /// Do NOT verify the TLS certificate of the identity provider
    #[arg(long)]
    pub insecure: bool,
}
