// ABOUTME: Entry point for the sshpin CLI application.
// ABOUTME: Parses arguments, runs one connection, and exits with the remote status.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use sshpin::output::{Output, OutputMode};
use sshpin::ssh::RemoteExit;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    });

    let code = match commands::connect(cli, &output).await {
        Ok(exit) => {
            if let RemoteExit::Signal {
                signal,
                core_dumped,
                message,
            } = &exit
            {
                let mut text = format!("remote process killed by signal {}", signal);
                if *core_dumped {
                    text.push_str(" (core dumped)");
                }
                if !message.is_empty() {
                    text.push_str(&format!(": {}", message));
                }
                output.error(&text);
            }
            exit.code()
        }
        Err(e) => {
            output.error(&e.to_string());
            e.exit_code()
        }
    };

    // Exit directly: a blocking stdin read may still be parked on a runtime
    // thread and would otherwise hold the process open.
    std::process::exit(i32::from(code));
}
