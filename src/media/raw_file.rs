// SPDX-License-Identifier: GPL-3.0-only

//! Raw `.yuv` files: back-to-back frames with no header

use crate::errors::{AppError, AppResult};
use crate::frame::{FrameGeometry, Layout, YuvFrame};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Reads fixed-size frames from a raw stream
pub struct RawFrameReader<R> {
    reader: R,
    geometry: FrameGeometry,
    layout: Layout,
    frames_read: u64,
}

impl RawFrameReader<BufReader<File>> {
    /// Open a raw file holding frames of the given size and layout
    pub fn open(path: &Path, width: u32, height: u32, layout: Layout) -> AppResult<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let reader = Self::new(BufReader::new(file), width, height, layout)?;
        let frame_len = reader.geometry.frame_len() as u64;
        if len % frame_len != 0 {
            debug!(
                path = %path.display(),
                len,
                frame_len,
                "File length is not a whole number of frames"
            );
        }
        info!(
            path = %path.display(),
            width,
            height,
            %layout,
            frames = len / frame_len,
            "Opened raw frame file"
        );
        Ok(reader)
    }
}

impl<R: Read> RawFrameReader<R> {
    pub fn new(reader: R, width: u32, height: u32, layout: Layout) -> AppResult<Self> {
        Ok(Self {
            reader,
            geometry: FrameGeometry::new(width, height)?,
            layout,
            frames_read: 0,
        })
    }

    /// Frames read so far, skipped ones included
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame
    ///
    /// `Ok(None)` at a clean end of stream; a partial trailing frame is an
    /// error.
    pub fn read_frame(&mut self) -> AppResult<Option<YuvFrame>> {
        let mut data = vec![0u8; self.geometry.frame_len()];
        let mut filled = 0;
        while filled < data.len() {
            match self.reader.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < data.len() {
            return Err(AppError::Other(format!(
                "truncated frame {}: {} of {} bytes",
                self.frames_read,
                filled,
                data.len()
            )));
        }

        self.frames_read += 1;
        Ok(Some(YuvFrame {
            data,
            geometry: self.geometry,
            layout: self.layout,
        }))
    }

    /// Skip `count` frames
    pub fn skip_frames(&mut self, count: u64) -> AppResult<()> {
        for _ in 0..count {
            if self.read_frame()?.is_none() {
                return Err(AppError::Other(format!(
                    "stream ended after {} frames",
                    self.frames_read
                )));
            }
        }
        Ok(())
    }
}

impl<R: Read> Iterator for RawFrameReader<R> {
    type Item = AppResult<YuvFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

/// Write frames back to back into a raw file
pub struct RawFrameWriter<W: Write> {
    writer: W,
    frames_written: u64,
}

impl RawFrameWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> AppResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> RawFrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_written: 0,
        }
    }

    pub fn write_frame(&mut self, frame: &YuvFrame) -> AppResult<()> {
        self.writer.write_all(&frame.data)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Flush and report how many frames were written
    pub fn finish(mut self) -> AppResult<u64> {
        self.writer.flush()?;
        Ok(self.frames_written)
    }
}
