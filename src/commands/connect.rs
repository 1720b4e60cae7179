// ABOUTME: Connect command implementation.
// ABOUTME: Resolves the key, verifies the host, authenticates, and runs one exec or shell channel.

use super::key_source;
use crate::cli::Cli;
use sshpin::credential::{self, Identity, TerminalPrompt};
use sshpin::diagnostics::{Diagnostics, Warning};
use sshpin::error::{Error, Result};
use sshpin::output::Output;
use sshpin::ssh::{Authenticated, PtyRequest, RemoteExit, Session, SessionConfig};
use sshpin::terminal::{self, RawMode};
use sshpin::trust::{self, Flush, TerminalDecider, TrustStore, Verifier};
use std::io::IsTerminal;
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use tokio::sync::mpsc;

/// Queue depth for resize/interrupt messages.
const CONTROL_QUEUE: usize = 16;

/// Connect to the host named on the command line and run the command or shell.
pub async fn connect(cli: Cli, output: &Output) -> Result<RemoteExit> {
    let mut diag = Diagnostics::default();

    let result = connect_and_run(cli, output, &mut diag).await;

    for warning in diag.warnings() {
        output.warning(&warning.to_string());
    }

    result
}

async fn connect_and_run(cli: Cli, output: &Output, diag: &mut Diagnostics) -> Result<RemoteExit> {
    let identity = resolve_identity(cli.key).await?;

    let store_path = match cli.known_hosts {
        Some(path) => path,
        None => trust::default_path().ok_or(Error::NoHomeDir)?,
    };
    let store = TrustStore::load(store_path, cli.no_store, diag)?;
    let verifier = Verifier::new(store, TerminalDecider::new());

    let mut config = SessionConfig::new(cli.host, cli.user).port(cli.port);
    if let Some(secs) = cli.connect_timeout {
        config = config.connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.keepalive {
        config = config.keepalive_interval(Duration::from_secs(secs));
    }

    let handshake = Session::connect(config, &verifier).await;
    // Trust decisions are kept even if anything after this point fails.
    persist_trust(&verifier, output, diag);
    let session = handshake?.authenticate(&identity).await?;
    drop(identity);

    match cli.cmd {
        Some(command) => {
            output.progress(&format!("Running command: {}", command));
            let exit = session
                .exec(&command, tokio::io::stdout(), tokio::io::stderr())
                .await?;
            Ok(exit)
        }
        None => interactive_shell(session).await,
    }
}

/// Read the key and turn it into an identity. Prompts may block, so this
/// runs off the async worker threads.
async fn resolve_identity(source: Option<String>) -> Result<Identity> {
    tokio::task::spawn_blocking(move || -> Result<Identity> {
        let mut key = key_source::read_key(source)?;
        Ok(credential::resolve(&mut key, &TerminalPrompt)?)
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

fn persist_trust(verifier: &Verifier, output: &Output, diag: &mut Diagnostics) {
    match verifier.flush() {
        Ok(Flush::Written) => output.progress("Host fingerprint saved."),
        Ok(Flush::Suppressed) => output.progress("Fingerprint not saved due to --no-store flag."),
        Ok(Flush::Unchanged) => {}
        Err(e) => diag.warn(Warning::DecisionNotSaved {
            reason: e.to_string(),
        }),
    }
}

async fn interactive_shell(session: Session<Authenticated>) -> Result<RemoteExit> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Err(Error::NotATerminal);
    }
    let fd = stdin.as_raw_fd();
    let pty = PtyRequest::from_size(terminal::window_size(fd));

    let raw_mode = RawMode::enable(fd)?;
    let (control_tx, control_rx) = mpsc::channel(CONTROL_QUEUE);
    // Fire and forget: the task ends with the process or when the shell's
    // receiver is dropped.
    terminal::spawn_signal_forwarder(fd, control_tx)?;

    let result = session
        .shell(
            &pty,
            tokio::io::stdin(),
            tokio::io::stdout(),
            tokio::io::stderr(),
            Some(control_rx),
        )
        .await;

    drop(raw_mode);
    Ok(result?)
}
