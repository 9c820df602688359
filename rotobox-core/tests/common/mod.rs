// rotobox-core/tests/common/mod.rs

// --- Fabricated media backend shared by the integration tests ---
//
// Produces solid-color frames, records what the pipeline writes and asks for,
// and can be scripted to fail at decode or remux time.

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use rotobox_core::error::{CoreError, CoreResult};
use rotobox_core::external::{
    ContainerMetadata, EncodeTarget, FrameSink, FrameSource, MediaBackend, MetadataProbe,
};
use rotobox_core::remux::RemuxRequest;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;

pub const BACKGROUND: [u8; 3] = [40, 40, 40];

pub fn metadata(width: u32, height: u32, fps: u32, frames: u64, has_audio: bool) -> ContainerMetadata {
    ContainerMetadata {
        size_bytes: 1_000_000,
        duration_secs: frames as f64 / f64::from(fps.max(1)),
        bit_rate: 800_000,
        frame_rate_num: fps,
        frame_rate_den: 1,
        width,
        height,
        nb_frames: Some(frames),
        has_audio,
    }
}

/// Shared record of everything the pipeline did with the backend.
#[derive(Default)]
pub struct Recorder {
    pub probes: Cell<usize>,
    pub frames_written: RefCell<Vec<RgbImage>>,
    pub sink_targets: RefCell<Vec<EncodeTarget>>,
    pub sink_finished: Cell<bool>,
    pub remux_requests: RefCell<Vec<RemuxRequest>>,
}

pub struct FakeBackend {
    pub metadata: ContainerMetadata,
    pub frames: u64,
    /// Decode fails when this frame index is requested.
    pub fail_decode_at: Option<u64>,
    /// Reported frame rate overriding the metadata (e.g. 0 for unknown).
    pub reported_fps: Option<f64>,
    pub probe_error: Option<String>,
    pub remux_error: Option<String>,
    pub record: Rc<Recorder>,
}

impl FakeBackend {
    pub fn new(metadata: ContainerMetadata) -> Self {
        let frames = metadata.nb_frames.unwrap_or(0);
        Self {
            metadata,
            frames,
            fail_decode_at: None,
            reported_fps: None,
            probe_error: None,
            remux_error: None,
            record: Rc::new(Recorder::default()),
        }
    }
}

pub struct FakeSource {
    width: u32,
    height: u32,
    fps: f64,
    total: u64,
    next: u64,
    fail_at: Option<u64>,
}

impl FrameSource for FakeSource {
    fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.total)
    }

    fn next_frame(&mut self) -> CoreResult<Option<RgbImage>> {
        if Some(self.next) == self.fail_at {
            return Err(CoreError::Source(format!("corrupt packet at frame {}", self.next)));
        }
        if self.next >= self.total {
            return Ok(None);
        }
        self.next += 1;
        Ok(Some(RgbImage::from_pixel(self.width, self.height, Rgb(BACKGROUND))))
    }
}

pub struct FakeSink {
    record: Rc<Recorder>,
}

impl FrameSink for FakeSink {
    fn write_frame(&mut self, frame: &RgbImage) -> CoreResult<()> {
        self.record.frames_written.borrow_mut().push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> CoreResult<()> {
        self.record.sink_finished.set(true);
        Ok(())
    }
}

impl MetadataProbe for FakeBackend {
    fn probe(&self, _path: &Path) -> CoreResult<ContainerMetadata> {
        self.record.probes.set(self.record.probes.get() + 1);
        match &self.probe_error {
            Some(msg) => Err(CoreError::Probe(msg.clone())),
            None => Ok(self.metadata.clone()),
        }
    }
}

impl MediaBackend for FakeBackend {
    type Source = FakeSource;
    type Sink = FakeSink;

    fn open_source(&self, _input: &Path, metadata: &ContainerMetadata) -> CoreResult<FakeSource> {
        Ok(FakeSource {
            width: metadata.width,
            height: metadata.height,
            fps: self.reported_fps.unwrap_or_else(|| metadata.frame_rate()),
            total: self.frames,
            next: 0,
            fail_at: self.fail_decode_at,
        })
    }

    fn open_sink(&self, target: &EncodeTarget) -> CoreResult<FakeSink> {
        self.record.sink_targets.borrow_mut().push(target.clone());
        Ok(FakeSink {
            record: Rc::clone(&self.record),
        })
    }

    fn remux(&self, request: &RemuxRequest) -> CoreResult<()> {
        self.record.remux_requests.borrow_mut().push(request.clone());
        if let Some(msg) = &self.remux_error {
            // A failed remux can leave a truncated file behind.
            fs::write(&request.output, b"partial")?;
            return Err(CoreError::Remux(msg.clone()));
        }
        fs::write(&request.output, b"final video")?;
        Ok(())
    }
}

/// Metadata probe answering from a fixed table.
#[derive(Default)]
pub struct TableProbe {
    pub entries: HashMap<PathBuf, ContainerMetadata>,
    pub calls: Mutex<Vec<PathBuf>>,
}

impl TableProbe {
    pub fn with(mut self, path: &str, metadata: ContainerMetadata) -> Self {
        self.entries.insert(PathBuf::from(path), metadata);
        self
    }
}

impl MetadataProbe for TableProbe {
    fn probe(&self, path: &Path) -> CoreResult<ContainerMetadata> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| CoreError::Probe(format!("no such file: {}", path.display())))
    }
}
