//! Album view: tracks, songs and the placement of pattern instances.
//!
//! Track `t` plays song `tracks[t]`; system `s` of that track is entry `s`
//! of the song's order list. Together these give the bijection between
//! `(track, system)` and [`PatInstRef`].

use std::collections::BTreeSet;

use kunquat_types::PatInstRef;

use super::keys;
use super::store::{encode, Store, Transaction};

pub struct Album<'a> {
    store: &'a Store,
}

impl<'a> Album<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn exists(&self) -> bool {
        self.store.contains(keys::ALBUM_MANIFEST)
    }

    fn tracks(&self) -> Vec<usize> {
        self.store.get_as::<Vec<usize>>(keys::ALBUM_TRACKS).unwrap_or_default()
    }

    pub fn track_count(&self) -> usize {
        self.tracks().len()
    }

    pub fn song_num(&self, track: usize) -> Option<usize> {
        self.tracks().get(track).copied()
    }

    pub fn order_list(&self, track: usize) -> Vec<PatInstRef> {
        let Some(song) = self.song_num(track) else {
            return Vec::new();
        };
        self.store
            .get_as::<Vec<(usize, usize)>>(&keys::order_list(song))
            .unwrap_or_default()
            .into_iter()
            .map(|(pat, inst)| PatInstRef::new(pat, inst))
            .collect()
    }

    pub fn system_count(&self, track: usize) -> usize {
        self.order_list(track).len()
    }

    pub fn pattern_instance(&self, track: usize, system: usize) -> Option<PatInstRef> {
        self.order_list(track).get(system).copied()
    }

    /// Current `(track, system)` of a pattern instance.
    pub fn pattern_instance_location(&self, pinst: PatInstRef) -> Option<(usize, usize)> {
        self.placements()
            .into_iter()
            .find(|&(_, _, p)| p == pinst)
            .map(|(track, system, _)| (track, system))
    }

    /// Every placed instance in album order.
    pub fn placements(&self) -> Vec<(usize, usize, PatInstRef)> {
        let mut out = Vec::new();
        for track in 0..self.track_count() {
            for (system, pinst) in self.order_list(track).into_iter().enumerate() {
                out.push((track, system, pinst));
            }
        }
        out
    }

    /// The first instance placed in more than one system, if any.
    pub fn duplicate_placement(&self) -> Option<PatInstRef> {
        let mut seen = BTreeSet::new();
        self.placements()
            .into_iter()
            .map(|(_, _, pinst)| pinst)
            .find(|pinst| !seen.insert(*pinst))
    }

    /// Locations of every placed instance of `pat_num`.
    pub fn pattern_locations(&self, pat_num: usize) -> Vec<(usize, usize)> {
        self.placements()
            .into_iter()
            .filter(|(_, _, p)| p.pat_num == pat_num)
            .map(|(t, s, _)| (t, s))
            .collect()
    }

    /// The placement after `(track, system)` in album order.
    pub fn next_location(&self, track: usize, system: usize) -> Option<(usize, usize)> {
        if system + 1 < self.system_count(track) {
            return Some((track, system + 1));
        }
        ((track + 1)..self.track_count())
            .find(|&t| self.system_count(t) > 0)
            .map(|t| (t, 0))
    }

    /// The placement before `(track, system)` in album order.
    pub fn prev_location(&self, track: usize, system: usize) -> Option<(usize, usize)> {
        if system > 0 {
            return Some((track, system - 1));
        }
        (0..track.min(self.track_count()))
            .rev()
            .find(|&t| self.system_count(t) > 0)
            .map(|t| (t, self.system_count(t) - 1))
    }
}

/// Album manifest plus a track list.
pub fn tracks_transaction(songs: &[usize]) -> Transaction {
    let mut tr = Transaction::new();
    tr.insert(keys::ALBUM_MANIFEST.to_string(), encode(&serde_json::json!({})));
    tr.insert(keys::ALBUM_TRACKS.to_string(), encode(songs));
    tr
}

/// Song manifest plus its order list.
pub fn order_list_transaction(song_num: usize, order: &[PatInstRef]) -> Transaction {
    let pairs: Vec<(usize, usize)> = order.iter().map(|p| (p.pat_num, p.inst_num)).collect();
    let mut tr = Transaction::new();
    tr.insert(keys::song_manifest(song_num), encode(&serde_json::json!({})));
    tr.insert(keys::order_list(song_num), encode(&pairs));
    tr
}
