//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::Parser;

/// Values left out on the command line are prompted for.
#[derive(Parser)]
#[command(name = "mailpost")]
#[command(version)]
#[command(about = "Send a markdown email through an SMTP provider", long_about = None)]
pub struct Cli {
    /// SMTP provider
    #[arg(long, default_value = "gmail")]
    pub provider: String,

    /// The email account to send from
    #[arg(long)]
    pub email: Option<String>,

    /// The password for the sending account
    #[arg(long, env = "MAILPOST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Receiver(s), comma-separated
    #[arg(long)]
    pub to: Option<String>,

    /// The email subject
    #[arg(long)]
    pub subject: Option<String>,

    /// The message to send, in markdown
    #[arg(long)]
    pub message: Option<String>,

    /// Provider file to use instead of the built-in providers
    #[arg(long, value_name = "FILE")]
    pub providers: Option<PathBuf>,
}
