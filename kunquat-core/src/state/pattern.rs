use kunquat_types::limits::{COLUMNS_MAX, PAT_INSTANCES_MAX, PAT_LENGTH_MAX_BEATS};
use kunquat_types::Tstamp;

use super::column::Column;
use super::keys;
use super::store::{encode, Store, Transaction};

pub const DEFAULT_LENGTH: Tstamp = Tstamp::from_beats(16);
pub const MIN_LENGTH: Tstamp = Tstamp::from_beats(1);
pub const MAX_LENGTH: Tstamp = Tstamp::from_beats(PAT_LENGTH_MAX_BEATS);

pub fn clamp_length(length: Tstamp) -> Tstamp {
    length.clamp_to(MIN_LENGTH, MAX_LENGTH)
}

/// Read access to one pattern and its columns.
pub struct Pattern<'a> {
    store: &'a Store,
    pat_num: usize,
}

impl<'a> Pattern<'a> {
    pub fn new(store: &'a Store, pat_num: usize) -> Self {
        Self { store, pat_num }
    }

    pub fn pat_num(&self) -> usize {
        self.pat_num
    }

    pub fn exists(&self) -> bool {
        self.store.contains(&keys::pattern_manifest(self.pat_num))
    }

    pub fn length(&self) -> Tstamp {
        self.store
            .get_as::<Tstamp>(&keys::pattern_length(self.pat_num))
            .map(clamp_length)
            .unwrap_or(DEFAULT_LENGTH)
    }

    /// Base grid pattern id; `None` selects the built-in default grid.
    pub fn base_grid_pattern_id(&self) -> Option<String> {
        self.store
            .get_as::<Option<String>>(&keys::base_grid(self.pat_num))
            .flatten()
    }

    pub fn instance_exists(&self, inst_num: usize) -> bool {
        self.store
            .contains(&keys::instance_manifest(self.pat_num, inst_num))
    }

    pub fn instances(&self) -> Vec<usize> {
        (0..PAT_INSTANCES_MAX)
            .filter(|&i| self.instance_exists(i))
            .collect()
    }

    pub fn column(&self, col_num: usize) -> Column {
        Column::load(self.store, self.pat_num, col_num.min(COLUMNS_MAX - 1))
    }

    pub fn edit_set_length(&self, length: Tstamp) -> Transaction {
        let mut tr = Transaction::new();
        tr.insert(keys::pattern_length(self.pat_num), encode(&clamp_length(length)));
        tr
    }

    pub fn edit_set_base_grid_pattern_id(&self, gp_id: Option<&str>) -> Transaction {
        let mut tr = Transaction::new();
        let value = gp_id.and_then(encode);
        tr.insert(keys::base_grid(self.pat_num), value);
        tr
    }
}

/// Manifests for a new pattern and its instances.
pub fn new_pattern_transaction(pat_num: usize, instances: &[usize], length: Tstamp) -> Transaction {
    let empty = serde_json::json!({});
    let mut tr = Transaction::new();
    tr.insert(keys::pattern_manifest(pat_num), encode(&empty));
    tr.insert(keys::pattern_length(pat_num), encode(&clamp_length(length)));
    for &inst in instances {
        tr.insert(keys::instance_manifest(pat_num, inst), encode(&empty));
    }
    tr
}
