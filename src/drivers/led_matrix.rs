//! Sense HAT 8×8 LED matrix via its Linux framebuffer.
//!
//! The HAT's kernel driver exposes the matrix as a 128-byte framebuffer:
//! one little-endian RGB565 word per pixel, row-major.  Writes go straight
//! to the device; nothing is buffered.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::LedMatrix;
use crate::app::progress::{Rgb, GRID_CELLS, GRID_SIZE};
use crate::error::{DisplayFailure, Error};

/// Name the kernel driver reports in `/sys/class/graphics/fbN/name`.
pub const SENSE_HAT_FB_NAME: &str = "RPi-Sense FB";

const BYTES_PER_PIXEL: u64 = 2;
const FRAME_BYTES: usize = GRID_CELLS as usize * BYTES_PER_PIXEL as usize;

/// Pack an 8-bit-per-channel colour into RGB565.
pub fn rgb565(colour: Rgb) -> u16 {
    let (r, g, b) = colour;
    (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3)
}

pub struct SenseHatMatrix<F> {
    fb: F,
}

impl SenseHatMatrix<File> {
    /// Find and open the Sense HAT framebuffer.
    pub fn open() -> Result<Self, Error> {
        let absent = |reason: String| Error::DeviceAbsent {
            device: "Sense HAT LED matrix",
            reason,
        };
        let dev = find_framebuffer(Path::new("/sys/class/graphics"))
            .ok_or_else(|| absent(DisplayFailure::NotFound.to_string()))?;
        let fb = OpenOptions::new()
            .write(true)
            .open(&dev)
            .map_err(|e| absent(format!("{}: {e}", dev.display())))?;
        info!("LED matrix: using {}", dev.display());
        Ok(Self::new(fb))
    }
}

impl<F: Write + Seek> SenseHatMatrix<F> {
    pub fn new(fb: F) -> Self {
        Self { fb }
    }

    pub fn into_inner(self) -> F {
        self.fb
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), DisplayFailure> {
        self.fb
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.fb.write_all(bytes))
            .and_then(|()| self.fb.flush())
            .map_err(|e| DisplayFailure::Io(e.kind()))
    }
}

impl<F: Write + Seek> LedMatrix for SenseHatMatrix<F> {
    fn clear(&mut self) -> Result<(), DisplayFailure> {
        self.write_at(0, &[0u8; FRAME_BYTES])
    }

    fn set_pixel(&mut self, row: u8, col: u8, colour: Rgb) -> Result<(), DisplayFailure> {
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return Err(DisplayFailure::OutOfBounds { row, col });
        }
        let offset = (u64::from(row) * u64::from(GRID_SIZE) + u64::from(col)) * BYTES_PER_PIXEL;
        self.write_at(offset, &rgb565(colour).to_le_bytes())
    }
}

/// Scan `class_dir/fb*/name` for the Sense HAT and return its `/dev` node.
fn find_framebuffer(class_dir: &Path) -> Option<PathBuf> {
    fs::read_dir(class_dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("fb"))
        .find(|entry| {
            fs::read_to_string(entry.path().join("name"))
                .is_ok_and(|name| name.trim() == SENSE_HAT_FB_NAME)
        })
        .map(|entry| Path::new("/dev").join(entry.file_name()))
}
