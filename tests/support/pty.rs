// ABOUTME: Pseudo-terminal pairs for tests that need a real terminal device.
// ABOUTME: Opens master and slave ends and reads or sets their termios and size.

use std::fs::File;
use std::os::unix::io::{FromRawFd, RawFd};

/// Master and slave ends of a pseudo-terminal.
pub struct Pty {
    pub master: File,
    pub slave: File,
}

pub fn open_pty() -> Pty {
    // SAFETY: standard posix_openpt sequence; every return value is checked and
    // the descriptors are handed to File for closing.
    unsafe {
        let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
        assert!(master >= 0, "posix_openpt failed");
        assert_eq!(libc::grantpt(master), 0, "grantpt failed");
        assert_eq!(libc::unlockpt(master), 0, "unlockpt failed");

        let mut name = [0 as libc::c_char; 128];
        assert_eq!(libc::ptsname_r(master, name.as_mut_ptr(), name.len()), 0);
        let slave = libc::open(name.as_ptr(), libc::O_RDWR | libc::O_NOCTTY);
        assert!(slave >= 0, "opening pty slave failed");

        Pty {
            master: File::from_raw_fd(master),
            slave: File::from_raw_fd(slave),
        }
    }
}

pub fn termios(fd: RawFd) -> libc::termios {
    // SAFETY: termios is plain old data filled in by tcgetattr.
    unsafe {
        let mut term = std::mem::zeroed::<libc::termios>();
        assert_eq!(libc::tcgetattr(fd, &mut term), 0);
        term
    }
}

pub fn set_size(fd: RawFd, cols: u16, rows: u16) {
    let ws = libc::winsize {
        ws_row: rows,
        ws_col: cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    // SAFETY: TIOCSWINSZ reads a winsize from the pointer.
    assert_eq!(unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &ws) }, 0);
}
