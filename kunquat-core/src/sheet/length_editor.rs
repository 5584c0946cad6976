//! Pattern length editing with live preview.
//!
//! While the user drags or types, [`LengthEditor::preview`] applies each
//! value inside one open history step; [`LengthEditor::finish`] commits it
//! and [`LengthEditor::cancel`] reverts it.

use kunquat_types::Tstamp;

use crate::state::pattern::{clamp_length, Pattern};

use super::manager::SheetManager;

#[derive(Debug, Default)]
pub struct LengthEditor {
    pat_num: Option<usize>,
    previewing: bool,
}

impl LengthEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(&self) -> Option<usize> {
        self.pat_num
    }

    /// Attach to the pattern under the cursor. Ends any running preview.
    pub fn attach(&mut self, manager: &mut SheetManager) {
        self.finish(manager);
        self.pat_num = manager.current_pattern_instance().map(|p| p.pat_num);
    }

    pub fn length(&self, manager: &SheetManager) -> Option<Tstamp> {
        self.pat_num
            .map(|pat_num| Pattern::new(manager.store(), pat_num).length())
    }

    pub fn preview(&mut self, manager: &mut SheetManager, length: Tstamp) {
        let Some(pat_num) = self.pat_num else {
            return;
        };
        let tr = Pattern::new(manager.store(), pat_num).edit_set_length(clamp_length(length));
        if manager.add_transaction(tr, true, Some(false)) {
            self.previewing = true;
        }
    }

    pub fn finish(&mut self, manager: &mut SheetManager) {
        if !std::mem::take(&mut self.previewing) {
            return;
        }
        manager.commit_open_step();
        manager.on_album_changed();
    }

    pub fn cancel(&mut self, manager: &mut SheetManager) {
        if std::mem::take(&mut self.previewing) {
            manager.rollback_open_step();
        }
    }
}
