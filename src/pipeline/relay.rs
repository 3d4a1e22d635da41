//! Single-slot frame mailbox between the capture worker and the display loop.
//!
//! No queueing: only the newest frame matters, so a publish overwrites the
//! slot in place. The writer never waits on a reader and a fast reader simply
//! sees the same frame again. The sequence counter lets a reader tell "same
//! frame as last tick" apart from "new frame" without adding backpressure.

use std::sync::Mutex;

use crate::capture::frame::Frame;

pub struct FrameRelay {
    slot: Mutex<Slot>,
}

struct Slot {
    frame: Frame,
    /// Bumped on every publish. 0 means only the initial zero-frame has been
    /// observed.
    seq: u64,
}

impl FrameRelay {
    /// A relay always holds some valid frame; before the first capture that
    /// is the zero-filled one.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                frame: Frame::black(),
                seq: 0,
            }),
        }
    }

    /// Full overwrite of the slot. The lock spans exactly the copy, so a
    /// reader can never observe a mixed old/new buffer.
    pub fn publish(&self, frame: &Frame) {
        let mut slot = self.slot.lock().unwrap();
        slot.frame.copy_from(frame);
        slot.seq += 1;
    }

    /// Copy the current frame out into `into`, returning the slot's sequence
    /// number. Idempotent: with no intervening publish, repeated calls return
    /// identical bytes and the same sequence.
    pub fn snapshot(&self, into: &mut Frame) -> u64 {
        let slot = self.slot.lock().unwrap();
        into.copy_from(&slot.frame);
        slot.seq
    }

    /// Copy out only if the slot advanced past `last_seen`; returns the new
    /// sequence when it did. Saves the reader a redundant texture upload when
    /// the writer is slower than the redraw tick.
    pub fn snapshot_if_newer(&self, last_seen: u64, into: &mut Frame) -> Option<u64> {
        let slot = self.slot.lock().unwrap();
        if slot.seq == last_seen {
            return None;
        }
        into.copy_from(&slot.frame);
        Some(slot.seq)
    }

    pub fn seq(&self) -> u64 {
        self.slot.lock().unwrap().seq
    }
}

impl Default for FrameRelay {
    fn default() -> Self {
        Self::new()
    }
}
