// ABOUTME: Trust decision providers consulted during host key verification.
// ABOUTME: The terminal provider asks the user on the controlling terminal.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};

/// Makes the explicit trust decisions the store cannot make on its own.
///
/// Calls block until an answer is available; the handshake waits on them.
pub trait TrustDecider: Send + Sync {
    /// First contact with `address`. Return `true` to pin `fingerprint`.
    fn trust_new_host(&self, address: &str, fingerprint: &str) -> io::Result<bool>;

    /// `address` presented `presented` but `pinned` is on record.
    /// Return `true` to replace the pinned fingerprint.
    fn trust_changed_host(&self, address: &str, pinned: &str, presented: &str)
    -> io::Result<bool>;
}

/// Asks on the controlling terminal (`/dev/tty`).
///
/// Reading from the terminal rather than stdin keeps prompts working when
/// stdin is redirected, and fails loudly when there is no terminal at all.
#[derive(Debug, Default)]
pub struct TerminalDecider;

impl TerminalDecider {
    pub fn new() -> Self {
        Self
    }

    fn ask(&self, question: &str) -> io::Result<bool> {
        let tty = OpenOptions::new().read(true).write(true).open("/dev/tty")?;
        let mut writer: &File = &tty;
        confirm(&mut BufReader::new(&tty), &mut writer, question)
    }
}

impl TrustDecider for TerminalDecider {
    fn trust_new_host(&self, address: &str, fingerprint: &str) -> io::Result<bool> {
        self.ask(&new_host_question(address, fingerprint))
    }

    fn trust_changed_host(
        &self,
        address: &str,
        pinned: &str,
        presented: &str,
    ) -> io::Result<bool> {
        self.ask(&changed_host_question(address, pinned, presented))
    }
}

fn new_host_question(address: &str, fingerprint: &str) -> String {
    format!("\nNew host: {address}\nFingerprint: {fingerprint}\nTrust this host? (y/n): ")
}

fn changed_host_question(address: &str, pinned: &str, presented: &str) -> String {
    format!(
        "\nWARNING: fingerprint for {address} has changed!\nOld: {pinned}\nNew: {presented}\n\
         Do you want to overwrite and trust the new fingerprint? (y/n): "
    )
}

/// Write `question`, read one line, and treat answers starting with `y` as yes.
/// End of input counts as no.
fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool> {
    output.write_all(question.as_bytes())?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_lowercase().starts_with('y'))
}
