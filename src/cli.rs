// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the connection target, key source, and trust store options.

use clap::Parser;
use std::path::PathBuf;

const EXIT_STATUS_HELP: &str = "\
Exit status:
  The remote command's or shell's exit status, or 255 if sshpin itself failed
  (bad key, untrusted host, connection or authentication error) or the remote
  process was killed by a signal. A remote status of 255 or more also exits
  255; the error message on stderr tells the cases apart.";

#[derive(Parser)]
#[command(name = "sshpin")]
#[command(about = "Minimal SSH client that pins host fingerprints on first use")]
#[command(version)]
#[command(after_help = EXIT_STATUS_HELP)]
pub struct Cli {
    /// SSH server hostname or IP
    #[arg(long)]
    pub host: String,

    /// SSH server port
    #[arg(short, long, default_value_t = 22)]
    pub port: u16,

    /// SSH username
    #[arg(short, long)]
    pub user: String,

    /// Private key file, or the key itself in PEM form; prompts for a pasted
    /// key when omitted
    #[arg(short, long, value_name = "PATH|PEM")]
    pub key: Option<String>,

    /// Command to run on the remote server; starts an interactive shell when
    /// omitted
    #[arg(short, long)]
    pub cmd: Option<String>,

    /// Do not store new or changed host fingerprints
    #[arg(long)]
    pub no_store: bool,

    /// Fingerprint store location (default: ~/.ssh/known_hosts.json)
    #[arg(long, value_name = "PATH")]
    pub known_hosts: Option<PathBuf>,

    /// Give up on the TCP connection after this many seconds
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Send a keepalive request to the server every SECS seconds
    #[arg(long, value_name = "SECS")]
    pub keepalive: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
