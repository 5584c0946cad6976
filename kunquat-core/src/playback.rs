//! Playback observer.
//!
//! The audio side posts [`PlaybackEvent`]s through a [`PlaybackFeed`]; the
//! UI thread drains them on each clock tick and keeps only the latest
//! snapshot.

use crossbeam_channel::{Receiver, Sender, TrySendError};

use kunquat_types::{Signal, Tstamp};

use crate::sheet::SheetManager;
use crate::state::PlaybackCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Position {
        track: usize,
        system: usize,
        row_ts: Tstamp,
    },
    Recording(bool),
    Stopped,
}

/// Sending half, owned by the audio thread.
#[derive(Debug, Clone)]
pub struct PlaybackFeed {
    tx: Sender<PlaybackEvent>,
}

impl PlaybackFeed {
    /// Returns `false` once the monitor is gone.
    pub fn send(&self, event: PlaybackEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Latest state seen by [`PlaybackMonitor::drain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub cursor: Option<PlaybackCursor>,
    pub playing: bool,
    pub recording: bool,
}

pub struct PlaybackMonitor {
    rx: Receiver<PlaybackEvent>,
    snapshot: PlaybackSnapshot,
}

impl PlaybackMonitor {
    pub fn channel() -> (Self, PlaybackFeed) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let monitor = Self {
            rx,
            snapshot: PlaybackSnapshot::default(),
        };
        (monitor, PlaybackFeed { tx })
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot
    }

    /// Fold all queued events into the snapshot and publish changes to the
    /// manager. Returns the number of events consumed.
    pub fn drain(&mut self, manager: &mut SheetManager) -> usize {
        let mut count = 0;
        let mut next = self.snapshot;
        while let Ok(event) = self.rx.try_recv() {
            count += 1;
            match event {
                PlaybackEvent::Position {
                    track,
                    system,
                    row_ts,
                } => {
                    next.cursor = Some(PlaybackCursor {
                        track,
                        system,
                        row_ts,
                    });
                    next.playing = true;
                }
                PlaybackEvent::Recording(on) => next.recording = on,
                PlaybackEvent::Stopped => {
                    next.playing = false;
                    next.cursor = None;
                }
            }
        }
        if count == 0 {
            return 0;
        }
        log::trace!(target: "playback", "drained {} events", count);

        if next.recording != self.snapshot.recording {
            manager.set_record_mode(next.recording);
        }
        if next.cursor != self.snapshot.cursor || next.playing != self.snapshot.playing {
            let session = manager.session_mut();
            session.playback_cursor = next.cursor;
            session.playing = next.playing;
            manager.signal(Signal::PlaybackPosition);
        }
        self.snapshot = next;
        count
    }
}
