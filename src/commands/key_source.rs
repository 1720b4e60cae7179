// ABOUTME: Reads private key material from a file, an inline argument, or pasted input.
// ABOUTME: Everything read is held in zeroizing buffers that never reallocate unscrubbed.

use sshpin::error::{Error, Result};
use std::io::{self, BufRead};
use zeroize::Zeroizing;

/// Room for a pasted 4096-bit RSA key in OpenSSH format with margin.
const KEY_CAPACITY: usize = 16 * 1024;
/// Room for one line of a pasted key. PEM lines are 64 or 70 characters.
const LINE_CAPACITY: usize = 1024;

/// Read key bytes from `source`.
///
/// A readable file path yields its contents; any other argument is taken as
/// the key itself. With no argument the key is pasted on stdin.
pub fn read_key(source: Option<String>) -> Result<Zeroizing<Vec<u8>>> {
    match source {
        Some(arg) => Ok(from_argument(Zeroizing::new(arg))),
        None => {
            eprintln!("Paste your private key (end with an empty line):");
            read_pasted(&mut io::stdin().lock()).map_err(Error::KeySource)
        }
    }
}

fn from_argument(arg: Zeroizing<String>) -> Zeroizing<Vec<u8>> {
    match std::fs::read(arg.as_str()) {
        Ok(bytes) => Zeroizing::new(bytes),
        Err(e) => {
            tracing::debug!("key argument is not a readable file ({}), using it as key text", e);
            Zeroizing::new(arg.as_bytes().to_vec())
        }
    }
}

/// Read lines until an empty line or end of input, joined with `\n`.
fn read_pasted<R: BufRead>(reader: &mut R) -> io::Result<Zeroizing<Vec<u8>>> {
    let mut key = Zeroizing::new(Vec::with_capacity(KEY_CAPACITY));
    let mut line = Zeroizing::new(Vec::with_capacity(LINE_CAPACITY));

    loop {
        line.clear();
        if !read_line(reader, &mut line)? {
            break;
        }
        let content = trim_line_end(&line);
        if content.is_empty() {
            break;
        }
        if !key.is_empty() {
            append(&mut key, b"\n");
        }
        append(&mut key, content);
    }

    Ok(key)
}

/// Append one line, newline included, to `line`. Returns `false` at end of
/// input with nothing read.
fn read_line<R: BufRead>(reader: &mut R, line: &mut Zeroizing<Vec<u8>>) -> io::Result<bool> {
    let mut read_any = false;
    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(read_any);
        }
        read_any = true;

        match available.iter().position(|b| *b == b'\n') {
            Some(end) => {
                append(line, &available[..=end]);
                reader.consume(end + 1);
                return Ok(true);
            }
            None => {
                let taken = available.len();
                append(line, available);
                reader.consume(taken);
            }
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| *b != b'\n' && *b != b'\r')
        .map_or(0, |last| last + 1);
    &line[..end]
}

/// Extend `buf` without leaving a copy behind: when it must grow, the bytes
/// move to a fresh buffer and the old one is zeroed as it drops.
fn append(buf: &mut Zeroizing<Vec<u8>>, bytes: &[u8]) {
    let needed = buf.len() + bytes.len();
    if needed > buf.capacity() {
        let mut grown = Zeroizing::new(Vec::with_capacity(needed.max(buf.capacity() * 2)));
        grown.extend_from_slice(buf);
        *buf = grown;
    }
    buf.extend_from_slice(bytes);
}
