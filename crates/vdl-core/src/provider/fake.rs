//! In-memory provider for unit tests.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::SourceProvider;
use crate::catalog::{Rendition, TransferHandle, VideoMetadata};
use crate::control::AbortToken;
use crate::error::{ResolutionError, TransferError};

#[derive(Debug, Clone)]
pub(crate) struct FakeVideo {
    metadata: VideoMetadata,
    renditions: Vec<Rendition>,
}

impl FakeVideo {
    pub(crate) fn new(id: &str, title: &str) -> Self {
        Self {
            metadata: VideoMetadata {
                id: id.to_string(),
                title: title.to_string(),
                length_seconds: 61,
                thumbnail_ref: format!("https://img.example.com/{}.jpg", id),
            },
            renditions: Vec::new(),
        }
    }

    pub(crate) fn with(mut self, label: &str, container: &str, size: u64) -> Self {
        let mut handle = TransferHandle::new(format!("fake://{}/{}", self.metadata.id, label));
        handle.size_hint = size;
        self.renditions.push(Rendition {
            resolution_label: label.to_string(),
            size_bytes: size,
            container_format: container.to_string(),
            transfer_handle: handle,
        });
        self
    }
}

/// How `open_transfer` behaves for one handle URL.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TransferBehavior {
    Complete,
    /// Fails with `TransferInterrupted` halfway through the first `times` attempts.
    Interrupt { times: u32 },
    /// Delivers half the bytes, then waits until aborted.
    WaitForAbort,
    /// Delivers half the bytes, then panics.
    Panic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkEvent {
    pub(crate) handle_url: String,
    pub(crate) bytes_downloaded: u64,
}

#[derive(Default)]
pub(crate) struct FakeProvider {
    videos: Mutex<HashMap<String, Result<FakeVideo, ResolutionError>>>,
    panicking: Mutex<HashSet<String>>,
    stalling: Mutex<HashSet<String>>,
    probe_calls: Mutex<HashMap<String, usize>>,
    behaviors: Mutex<HashMap<String, TransferBehavior>>,
    attempts: Mutex<HashMap<String, u32>>,
    events: Mutex<Vec<ChunkEvent>>,
    chunk_delay: Mutex<Duration>,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, url: &str, video: FakeVideo) {
        self.videos.lock().unwrap().insert(url.to_string(), Ok(video));
    }

    pub(crate) fn fail(&self, url: &str, err: ResolutionError) {
        self.videos.lock().unwrap().insert(url.to_string(), Err(err));
    }

    /// Probing `url` panics.
    pub(crate) fn panic_on(&self, url: &str) {
        self.panicking.lock().unwrap().insert(url.to_string());
    }

    /// Probing `url` blocks until the job is aborted.
    pub(crate) fn stall_on(&self, url: &str) {
        self.stalling.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn set_behavior(&self, handle_url: &str, behavior: TransferBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(handle_url.to_string(), behavior);
    }

    pub(crate) fn set_chunk_delay(&self, delay: Duration) {
        *self.chunk_delay.lock().unwrap() = delay;
    }

    pub(crate) fn probe_calls(&self, url: &str) -> usize {
        self.probe_calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_probe_calls(&self) -> usize {
        self.probe_calls.lock().unwrap().values().sum()
    }

    pub(crate) fn attempts(&self, handle_url: &str) -> u32 {
        self.attempts.lock().unwrap().get(handle_url).copied().unwrap_or(0)
    }

    pub(crate) fn events(&self) -> Vec<ChunkEvent> {
        self.events.lock().unwrap().clone()
    }

    fn lookup(&self, url: &str) -> Result<FakeVideo, ResolutionError> {
        *self
            .probe_calls
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;
        if self.panicking.lock().unwrap().contains(url) {
            panic!("fake provider exploded on {}", url);
        }
        self.videos
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(ResolutionError::Unavailable(format!("unknown video {}", url))))
    }
}

impl SourceProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ResolutionError> {
        self.lookup(url).map(|v| v.metadata)
    }

    fn enumerate_renditions(&self, url: &str) -> Result<Vec<Rendition>, ResolutionError> {
        self.lookup(url).map(|v| v.renditions)
    }

    fn probe(
        &self,
        url: &str,
        abort: &AbortToken,
    ) -> Result<(VideoMetadata, Vec<Rendition>), ResolutionError> {
        let video = self.lookup(url);
        if self.stalling.lock().unwrap().contains(url) {
            while !abort.is_aborted() {
                std::thread::sleep(Duration::from_millis(5));
            }
            return Err(ResolutionError::Aborted);
        }
        video.map(|v| (v.metadata, v.renditions))
    }

    fn open_transfer(
        &self,
        handle: &TransferHandle,
        dest_dir: &Path,
        filename: &str,
        abort: &AbortToken,
        on_chunk: &mut dyn FnMut(u64, u64),
    ) -> Result<PathBuf, TransferError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(handle.url.clone()).or_default();
            *n += 1;
            *n
        };
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&handle.url)
            .copied()
            .unwrap_or(TransferBehavior::Complete);
        let delay = *self.chunk_delay.lock().unwrap();

        let path = dest_dir.join(filename);
        let mut file = File::create(&path)
            .map_err(|e| TransferError::DestinationUnwritable(e.to_string()))?;

        let total = handle.size_hint;
        let chunk = (total / 4).max(1);
        let mut done = 0u64;
        while done < total {
            if abort.is_aborted() {
                return Err(TransferError::Aborted);
            }
            let n = chunk.min(total - done);
            file.write_all(&vec![b'x'; n as usize])
                .map_err(|e| TransferError::DestinationUnwritable(e.to_string()))?;
            done += n;
            self.events.lock().unwrap().push(ChunkEvent {
                handle_url: handle.url.clone(),
                bytes_downloaded: done,
            });
            on_chunk(done, total);

            if done * 2 >= total {
                match behavior {
                    TransferBehavior::Interrupt { times } if attempt <= times => {
                        return Err(TransferError::TransferInterrupted(
                            "connection reset".to_string(),
                        ));
                    }
                    TransferBehavior::WaitForAbort => {
                        while !abort.is_aborted() {
                            std::thread::sleep(Duration::from_millis(5));
                        }
                        return Err(TransferError::Aborted);
                    }
                    TransferBehavior::Panic => panic!("fake transfer exploded"),
                    _ => {}
                }
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        Ok(path)
    }
}
