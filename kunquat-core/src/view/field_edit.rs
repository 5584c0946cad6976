//! In-field text entry of trigger types and arguments.
//!
//! Typing a new trigger inserts it at once with an example argument; the
//! insertion stays in an open history step until the argument is
//! confirmed, so cancelling removes it without a trace. Inside a chord or
//! gesture the step belongs to the caller: confirming leaves it open and
//! cancelling restores only the row the entry touched.

use kunquat_types::events;
use kunquat_types::{Trigger, TriggerPosition};

use crate::error::{SheetError, SheetResult};
use crate::sheet::SheetManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStage {
    Type,
    Argument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// More input is expected.
    Continue,
    Done,
}

#[derive(Debug, Clone)]
pub struct TriggerEntry {
    stage: EntryStage,
    text: String,
    trigger_type: Option<String>,
    origin: TriggerPosition,
    /// Row contents at `origin` before the entry inserted its trigger.
    saved_row: Option<Vec<Trigger>>,
    /// The entry opened the history step it writes to.
    owns_step: bool,
}

impl TriggerEntry {
    /// Start typing a new trigger at the cursor.
    pub fn new_trigger(manager: &SheetManager) -> Self {
        Self {
            stage: EntryStage::Type,
            text: String::new(),
            trigger_type: None,
            origin: manager.selection().location(),
            saved_row: None,
            owns_step: false,
        }
    }

    /// Edit the argument of the trigger under the cursor.
    pub fn edit_argument(manager: &SheetManager) -> Option<Self> {
        let trigger = manager.get_selected_trigger()?;
        trigger.arg_type().filter(|t| t.takes_argument())?;
        Some(Self {
            stage: EntryStage::Argument,
            text: trigger.argument().unwrap_or("").to_string(),
            trigger_type: Some(trigger.trigger_type().to_string()),
            origin: manager.selection().location(),
            saved_row: None,
            owns_step: false,
        })
    }

    pub fn stage(&self) -> EntryStage {
        self.stage
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    pub fn insert_char(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn confirm(&mut self, manager: &mut SheetManager) -> SheetResult<EntryOutcome> {
        match self.stage {
            EntryStage::Type => self.confirm_type(manager),
            EntryStage::Argument => self.confirm_argument(manager),
        }
    }

    fn confirm_type(&mut self, manager: &mut SheetManager) -> SheetResult<EntryOutcome> {
        let name = self.text.trim().to_string();
        let Some(event) = events::trigger_event_by_name(&name) else {
            return Err(SheetError::ValidationRejected(format!(
                "unknown trigger type '{}'",
                name
            )));
        };
        let Some(example) = event.arg_type.example_argument() else {
            manager.add_trigger(Trigger::new(name, None))?;
            return Ok(EntryOutcome::Done);
        };

        let saved_row = manager
            .current_column()
            .map(|c| c.row(self.origin.row_ts).to_vec())
            .unwrap_or_default();
        let owns_step = !manager.is_deferring() && !manager.history().has_open_step();
        manager.add_trigger_uncommitted(Trigger::new(name.clone(), Some(example.to_string())))?;
        self.saved_row = Some(saved_row);
        self.owns_step = owns_step;
        manager.set_location(self.origin);
        self.trigger_type = Some(name);
        self.stage = EntryStage::Argument;
        self.text = example.to_string();
        Ok(EntryOutcome::Continue)
    }

    fn confirm_argument(&mut self, manager: &mut SheetManager) -> SheetResult<EntryOutcome> {
        let trigger_type = self.trigger_type.clone().unwrap_or_default();
        let trigger = Trigger::checked(&trigger_type, Some(self.text.as_str()))?;
        manager.replace_selected_trigger(trigger, None)?;
        manager.commit_open_step();
        let next = if self.saved_row.take().is_some() {
            manager.location_after_insert(self.origin)
        } else {
            self.origin.with_trigger_index(self.origin.trigger_index + 1)
        };
        self.owns_step = false;
        manager.set_location(next);
        Ok(EntryOutcome::Done)
    }

    /// Abandon the entry. A trigger inserted for it is removed again.
    pub fn cancel(self, manager: &mut SheetManager) {
        if let Some(row) = self.saved_row {
            if self.owns_step {
                manager.rollback_open_step();
            } else {
                manager.set_trigger_row(self.origin, row);
            }
        }
        manager.set_location(self.origin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetConfig;
    use crate::state::album::{order_list_transaction, tracks_transaction};
    use crate::state::pattern::new_pattern_transaction;
    use crate::state::Store;
    use kunquat_types::{ts, PatInstRef};

    fn manager() -> SheetManager {
        let mut store = Store::new();
        store.apply(&new_pattern_transaction(0, &[0], ts(8, 0)));
        store.apply(&tracks_transaction(&[0]));
        store.apply(&order_list_transaction(0, &[PatInstRef::new(0, 0)]));
        let mut m = SheetManager::with_store(store, SheetConfig::default());
        m.set_location(TriggerPosition::new(0, 0, 0, ts(2, 0), 0));
        m
    }

    fn type_text(entry: &mut TriggerEntry, text: &str) {
        entry.set_text("");
        for c in text.chars() {
            entry.insert_char(c);
        }
    }

    #[test]
    fn new_trigger_with_argument_is_one_step() {
        let mut m = manager();
        let mut entry = TriggerEntry::new_trigger(&m);
        type_text(&mut entry, "n+");
        assert_eq!(entry.confirm(&mut m).unwrap(), EntryOutcome::Continue);
        assert_eq!(entry.stage(), EntryStage::Argument);
        assert_eq!(entry.text(), "0");
        assert!(m.is_at_trigger());

        type_text(&mut entry, "1200");
        assert_eq!(entry.confirm(&mut m).unwrap(), EntryOutcome::Done);
        assert_eq!(m.history().past_len(), 1);
        assert!(!m.history().has_open_step());
        let row = m.current_column().unwrap().row(ts(2, 0)).to_vec();
        assert_eq!(row, vec![Trigger::new("n+", Some("1200".into()))]);
        assert_eq!(m.selection().location().trigger_index, 1);
    }

    #[test]
    fn confirming_example_argument_commits() {
        let mut m = manager();
        let mut entry = TriggerEntry::new_trigger(&m);
        type_text(&mut entry, "h");
        entry.confirm(&mut m).unwrap();
        entry.confirm(&mut m).unwrap();
        assert!(!m.history().has_open_step());
        assert_eq!(m.history().past_len(), 1);
    }

    #[test]
    fn argumentless_trigger_is_done_at_once() {
        let mut m = manager();
        let mut entry = TriggerEntry::new_trigger(&m);
        type_text(&mut entry, "n-");
        assert_eq!(entry.confirm(&mut m).unwrap(), EntryOutcome::Done);
        assert!(m.can_undo());
    }

    #[test]
    fn cancel_removes_inserted_trigger() {
        let mut m = manager();
        let mut entry = TriggerEntry::new_trigger(&m);
        type_text(&mut entry, ".f");
        entry.confirm(&mut m).unwrap();
        entry.cancel(&mut m);
        assert!(!m.is_at_trigger_row());
        assert!(!m.can_undo());
        assert!(!m.can_redo());
    }

    #[test]
    fn bad_input_keeps_entry_open() {
        let mut m = manager();
        let mut entry = TriggerEntry::new_trigger(&m);
        type_text(&mut entry, "nope");
        assert!(entry.confirm(&mut m).is_err());
        assert_eq!(entry.stage(), EntryStage::Type);

        type_text(&mut entry, "n+");
        entry.confirm(&mut m).unwrap();
        type_text(&mut entry, "abc");
        assert!(entry.confirm(&mut m).is_err());
        assert_eq!(entry.stage(), EntryStage::Argument);
        assert!(m.history().has_open_step());
    }

    #[test]
    fn edit_existing_argument() {
        let mut m = manager();
        m.add_trigger(Trigger::new(".f", Some("0.5".into()))).unwrap();
        m.set_location(TriggerPosition::new(0, 0, 0, ts(2, 0), 0));
        let mut entry = TriggerEntry::edit_argument(&m).unwrap();
        assert_eq!(entry.text(), "0.5");
        type_text(&mut entry, "-3");
        entry.confirm(&mut m).unwrap();
        let row = m.current_column().unwrap().row(ts(2, 0)).to_vec();
        assert_eq!(row, vec![Trigger::new(".f", Some("-3".into()))]);
        assert_eq!(m.history().past_len(), 2);
    }

    fn row_at(m: &SheetManager, col_num: usize) -> Vec<Trigger> {
        m.column_at(0, 0, col_num).unwrap().row(ts(2, 0)).to_vec()
    }

    #[test]
    fn chord_cancel_keeps_earlier_notes() {
        let mut m = manager();
        m.set_chord_mode(true);
        m.add_trigger(Trigger::new("n+", Some("0".into()))).unwrap();

        let mut entry = TriggerEntry::new_trigger(&m);
        type_text(&mut entry, ".f");
        entry.confirm(&mut m).unwrap();
        assert_eq!(row_at(&m, 1).len(), 1);
        entry.cancel(&mut m);

        assert_eq!(row_at(&m, 0), vec![Trigger::new("n+", Some("0".into()))]);
        assert!(row_at(&m, 1).is_empty());
        assert_eq!(m.selection().location().col_num, 1);
        assert!(m.history().has_open_step());

        m.set_chord_mode(false);
        assert_eq!(m.history().past_len(), 1);
        assert!(m.undo());
        assert!(row_at(&m, 0).is_empty());
    }

    #[test]
    fn chord_confirm_leaves_step_open() {
        let mut m = manager();
        m.set_chord_mode(true);
        m.add_trigger(Trigger::new("n+", Some("0".into()))).unwrap();

        let mut entry = TriggerEntry::new_trigger(&m);
        type_text(&mut entry, "n+");
        assert_eq!(entry.confirm(&mut m).unwrap(), EntryOutcome::Continue);
        type_text(&mut entry, "400");
        assert_eq!(entry.confirm(&mut m).unwrap(), EntryOutcome::Done);
        assert!(m.history().has_open_step());
        assert_eq!(m.history().past_len(), 0);
        assert_eq!(m.selection().location().col_num, 2);

        m.add_trigger(Trigger::new("n+", Some("700".into()))).unwrap();
        m.set_chord_mode(false);
        assert_eq!(m.history().past_len(), 1);
        assert_eq!(row_at(&m, 1), vec![Trigger::new("n+", Some("400".into()))]);

        assert!(m.undo());
        for col_num in 0..3 {
            assert!(row_at(&m, col_num).is_empty());
        }
    }

    #[test]
    fn gesture_cancel_restores_replaced_trigger() {
        let mut m = manager();
        let original = Trigger::new(".f", Some("0.5".into()));
        m.add_trigger(original.clone()).unwrap();
        m.set_location(TriggerPosition::new(0, 0, 0, ts(2, 0), 0));
        m.set_replace_mode(true);
        {
            let mut gesture = m.begin_gesture();
            let mut entry = TriggerEntry::new_trigger(&gesture);
            type_text(&mut entry, "n+");
            entry.confirm(&mut gesture).unwrap();
            assert_eq!(row_at(&gesture, 0), vec![Trigger::new("n+", Some("0".into()))]);
            entry.cancel(&mut gesture);
            assert_eq!(row_at(&gesture, 0), vec![original.clone()]);
        }
        assert!(!m.history().has_open_step());
        assert_eq!(m.history().past_len(), 1);
    }
}
