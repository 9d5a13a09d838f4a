// SPDX-License-Identifier: GPL-3.0-only

//! Latest-frame hand-off between producer and render thread
//!
//! One slot, latest wins. The producer copies a frame in under the lock; the
//! render thread swaps the slot buffer with its private upload buffer under
//! the same lock and uploads after releasing it. Neither side ever observes
//! a half-written frame, and the producer never waits on GPU work.

use super::backend::FramePlanes;
use crate::errors::TransformResult;
use crate::frame::{FrameGeometry, Layout, PlaneOffsets};
use crate::transform;
use std::sync::Mutex;

/// A planar frame buffer with the offsets of its three planes
#[derive(Debug, Default)]
pub(crate) struct FrameBuffer {
    data: Vec<u8>,
    geometry: Option<FrameGeometry>,
    offsets: PlaneOffsets,
    generation: u64,
}

impl FrameBuffer {
    /// Plane views for upload, if the buffer holds a frame
    pub(crate) fn planes(&self) -> Option<FramePlanes<'_>> {
        let geometry = self.geometry?;
        let luma = geometry.luma_len();
        let quarter = geometry.chroma_plane_len();
        Some(FramePlanes {
            width: geometry.width(),
            height: geometry.height(),
            y: &self.data[self.offsets.y..self.offsets.y + luma],
            u: &self.data[self.offsets.u..self.offsets.u + quarter],
            v: &self.data[self.offsets.v..self.offsets.v + quarter],
        })
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn dimensions(&self) -> Option<(u32, u32)> {
        self.geometry.map(|g| (g.width(), g.height()))
    }
}

/// The shared slot
#[derive(Debug, Default)]
pub(crate) struct FrameSlot {
    latest: Mutex<FrameBuffer>,
}

impl FrameSlot {
    /// Copy a validated frame into the slot, replacing any pending one
    ///
    /// Planar layouts are copied as-is with their plane offsets. Semi-planar
    /// layouts are rearranged to I420 while copying.
    pub(crate) fn store(
        &self,
        src: &[u8],
        geometry: FrameGeometry,
        layout: Layout,
    ) -> TransformResult<u64> {
        geometry.check_len(src.len())?;
        let mut slot = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        slot.data.resize(src.len(), 0);

        if layout.is_semi_planar() {
            transform::convert_into(
                src,
                &mut slot.data,
                geometry.width(),
                geometry.height(),
                layout,
                Layout::I420,
            )?;
            slot.offsets = geometry.plane_offsets(Layout::I420);
        } else {
            slot.data.copy_from_slice(src);
            slot.offsets = geometry.plane_offsets(layout);
        }

        slot.geometry = Some(geometry);
        slot.generation += 1;
        Ok(slot.generation)
    }

    /// Swap the latest frame into `upload` if it is newer than what `upload` holds
    ///
    /// Returns whether a newer frame was taken.
    pub(crate) fn take_newer(&self, upload: &mut FrameBuffer) -> bool {
        let mut slot = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        if slot.geometry.is_none() || slot.generation <= upload.generation {
            return false;
        }
        std::mem::swap(&mut slot.data, &mut upload.data);
        // The slot now holds the recycled buffer
        upload.geometry = slot.geometry.take();
        upload.offsets = slot.offsets;
        upload.generation = slot.generation;
        true
    }

    /// Put a taken frame back if nothing newer arrived since
    ///
    /// Used when a render thread exits so that the next one can upload the
    /// same frame.
    pub(crate) fn restore(&self, upload: &mut FrameBuffer) {
        let mut slot = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        if slot.geometry.is_some() || upload.geometry.is_none() {
            return;
        }
        if upload.generation != slot.generation {
            return;
        }
        std::mem::swap(&mut slot.data, &mut upload.data);
        slot.geometry = upload.geometry.take();
        slot.offsets = upload.offsets;
    }

    /// Whether any frame has ever been stored
    pub(crate) fn has_frame(&self) -> bool {
        let slot = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        slot.generation > 0
    }
}
