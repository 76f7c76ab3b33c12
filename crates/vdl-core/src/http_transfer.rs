//! Single-stream HTTP GET of one rendition into a destination file.
//!
//! Writes the response body sequentially, truncating any previous file of the
//! same name, and reports every received chunk. Runs in the current thread;
//! call from `spawn_blocking` if used from async code.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str;
use std::time::Duration;

use crate::catalog::TransferHandle;
use crate::control::AbortToken;
use crate::error::TransferError;

fn curl_err(e: curl::Error) -> TransferError {
    TransferError::TransferInterrupted(format!("curl: {}", e))
}

/// Parses a `Content-Length` header line.
fn content_length(line: &str) -> Option<u64> {
    let (name, value) = line.split_once(':')?;
    if name.trim().eq_ignore_ascii_case("content-length") {
        value.trim().parse().ok()
    } else {
        None
    }
}

/// Downloads `handle` into `dest`. Calls `on_chunk(bytes_downloaded, bytes_total)`
/// after every write, where the total comes from `Content-Length` or the
/// handle's size hint (0 if neither is known). Returns the byte count.
pub fn download_to_file(
    handle: &TransferHandle,
    dest: &Path,
    abort: &AbortToken,
    on_chunk: &mut dyn FnMut(u64, u64),
) -> Result<u64, TransferError> {
    let mut file = File::create(dest).map_err(|e| {
        TransferError::DestinationUnwritable(format!("{}: {}", dest.display(), e))
    })?;

    let written = Cell::new(0u64);
    let announced = Cell::new(None::<u64>);
    let write_failure: RefCell<Option<io::Error>> = RefCell::new(None);
    let hint = Some(handle.size_hint).filter(|s| *s > 0);

    let mut easy = curl::easy::Easy::new();
    easy.url(&handle.url).map_err(curl_err)?;
    easy.follow_location(true).map_err(curl_err)?;
    easy.max_redirections(10).map_err(curl_err)?;
    easy.fail_on_error(true).map_err(curl_err)?;
    easy.connect_timeout(Duration::from_secs(30)).map_err(curl_err)?;
    // Stall detection only; no overall deadline.
    easy.low_speed_limit(1024).map_err(curl_err)?;
    easy.low_speed_time(Duration::from_secs(60)).map_err(curl_err)?;
    easy.progress(true).map_err(curl_err)?;

    let mut list = curl::easy::List::new();
    for (k, v) in &handle.headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(curl_err)?;
    }
    if !handle.headers.is_empty() {
        easy.http_headers(list).map_err(curl_err)?;
    }

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    // Each redirect hop starts a new header block.
                    if line.starts_with("HTTP/") {
                        announced.set(None);
                    } else if let Some(n) = content_length(line) {
                        announced.set(Some(n));
                    }
                }
                true
            })
            .map_err(curl_err)?;
        transfer
            .write_function(|data| {
                if abort.is_aborted() {
                    return Ok(0);
                }
                if let Err(e) = file.write_all(data) {
                    *write_failure.borrow_mut() = Some(e);
                    return Ok(0);
                }
                let done = written.get() + data.len() as u64;
                written.set(done);
                let total = announced.get().or(hint).unwrap_or(0);
                on_chunk(done, total);
                Ok(data.len())
            })
            .map_err(curl_err)?;
        transfer
            .progress_function(|_, _, _, _| !abort.is_aborted())
            .map_err(curl_err)?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if abort.is_aborted() {
            tracing::debug!(dest = %dest.display(), "transfer aborted");
            return Err(TransferError::Aborted);
        }
        if let Some(io_err) = write_failure.into_inner() {
            return Err(TransferError::DestinationUnwritable(format!(
                "{}: {}",
                dest.display(),
                io_err
            )));
        }
        let code = easy.response_code().unwrap_or(0);
        if code >= 400 {
            return Err(TransferError::TransferInterrupted(format!("HTTP {}", code)));
        }
        return Err(curl_err(e));
    }

    let code = easy.response_code().map_err(curl_err)?;
    if !(200..300).contains(&code) {
        return Err(TransferError::TransferInterrupted(format!("HTTP {}", code)));
    }

    let done = written.get();
    if let Some(expected) = announced.get() {
        if done != expected {
            return Err(TransferError::TransferInterrupted(format!(
                "short body: received {} of {} bytes",
                done, expected
            )));
        }
    }

    file.flush()
        .and_then(|_| file.sync_all())
        .map_err(|e| TransferError::DestinationUnwritable(format!("{}: {}", dest.display(), e)))?;
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_length_header() {
        assert_eq!(content_length("Content-Length: 1234\r\n"), Some(1234));
        assert_eq!(content_length("content-length:7"), Some(7));
        assert_eq!(content_length("Content-Type: video/mp4"), None);
        assert_eq!(content_length("HTTP/1.1 200 OK"), None);
    }

    #[test]
    fn unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing-subdir").join("out.mp4");
        let err = download_to_file(
            &TransferHandle::new("http://127.0.0.1:9/never"),
            &dest,
            &AbortToken::new(),
            &mut |_, _| {},
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::DestinationUnwritable(_)));
    }
}
