//! Wires Ctrl-C and a `q` line on stdin to the shutdown token
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use motionwatch_motion_ai::shutdown::Shutdown;
use std::io::{self, BufRead};
use std::thread;

/// Requests shutdown on Ctrl-C. The signal is awaited on a small runtime
/// living on its own thread so the frame loop stays synchronous.
pub fn install_ctrl_c(shutdown: Shutdown) -> io::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            rt.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Received shutdown signal");
                        shutdown.request();
                    }
                    Err(e) => warn!("Unable to listen for Ctrl-C: {e}"),
                }
            })
        })?;
    Ok(())
}

/// Requests shutdown when a line reading `q` arrives on stdin.
pub fn install_quit_key(shutdown: Shutdown) -> io::Result<()> {
    thread::Builder::new().name("quit-key".into()).spawn(move || {
        let stdin = io::stdin();
        watch_for_quit(stdin.lock(), &shutdown);
    })?;
    Ok(())
}

pub fn watch_for_quit<R: BufRead>(input: R, shutdown: &Shutdown) {
    for line in input.lines() {
        match line {
            Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                info!("Quit requested from the console");
                shutdown.request();
                return;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Stopped reading stdin: {e}");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn q_line_requests_shutdown() {
        let shutdown = Shutdown::new();
        watch_for_quit(Cursor::new("hello\n\n q \nmore\n"), &shutdown);
        assert!(shutdown.is_requested());
    }

    #[test]
    fn other_lines_do_not_request_shutdown() {
        let shutdown = Shutdown::new();
        watch_for_quit(Cursor::new("quit\nqq\n"), &shutdown);
        assert!(!shutdown.is_requested());
    }
}
