//! Request loop used by the binary.
//!
//! Lines arrive over a channel (fed by a stdin reader thread) so the loop can
//! poll the cancel token between requests instead of blocking on input.

use std::io::{self, Write};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use joint_runtime::CancelToken;
use tracing::{debug, info};

use crate::components::server::Server;

/// How long one wait for input may block before the token is rechecked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Serve requests until `cancel` fires or the input channel closes.
///
/// Returns the number of requests answered.
pub fn serve(
    server: &Server,
    lines: &Receiver<String>,
    out: &mut impl Write,
    cancel: &CancelToken,
) -> io::Result<u64> {
    let mut answered = 0;
    while !cancel.is_cancelled() {
        let line = match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("input closed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        writeln!(out, "{}", server.handle_line(line))?;
        out.flush()?;
        answered += 1;
    }
    info!(answered, "request loop finished");
    Ok(answered)
}
