//! Grid pattern table editing.
//!
//! Grid pattern edits bypass sheet history. Each edit is validated as a
//! whole before anything is written; a failed edit leaves the store as it
//! was.

use kunquat_types::limits::STYLE_COUNT;
use kunquat_types::{Signal, Tstamp};

use crate::state::grid_pattern::{GridLine, GridPattern, GridPatternError, GridPatterns};

use super::manager::SheetManager;

pub type GridEditResult<T = ()> = Result<T, GridPatternError>;

#[derive(Debug, Default)]
pub struct GridEditor {
    selected: Option<String>,
    selected_line: Option<Tstamp>,
}

impl GridEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_line(&self) -> Option<Tstamp> {
        self.selected_line
    }

    pub fn selected_pattern(&self, manager: &SheetManager) -> Option<GridPattern> {
        let id = self.selected.as_deref()?;
        GridPatterns::new(manager.store()).get(id)
    }

    pub fn select(&mut self, manager: &mut SheetManager, gp_id: Option<&str>) {
        let gp_id = gp_id.map(str::to_string);
        if self.selected != gp_id {
            self.selected = gp_id;
            self.selected_line = None;
            manager.signal(Signal::GridPatternSelection);
            manager.signal(Signal::GridPatternLineSelection);
        }
    }

    pub fn select_line(&mut self, manager: &mut SheetManager, line_ts: Option<Tstamp>) {
        if self.selected_line != line_ts {
            self.selected_line = line_ts;
            manager.signal(Signal::GridPatternLineSelection);
        }
    }

    /// Add a copy of the built-in grid pattern under a fresh id and select it.
    pub fn add_pattern(&mut self, manager: &mut SheetManager, name: &str) -> GridEditResult<String> {
        let patterns = GridPatterns::new(manager.store());
        let ids = patterns.ids();
        let gp_id = (0..)
            .map(|n| format!("gp_{:02x}", n))
            .find(|id| !ids.contains(id))
            .unwrap_or_default();
        let gp = GridPattern {
            name: name.to_string(),
            ..GridPattern::default()
        };
        let tr = patterns.edit_set(&gp_id, &gp)?;
        manager.apply_untracked(tr);
        manager.signal(Signal::GridPatternList);
        log::debug!(target: "grid", "added grid pattern {}", gp_id);
        self.select(manager, Some(&gp_id));
        Ok(gp_id)
    }

    pub fn remove_pattern(&mut self, manager: &mut SheetManager, gp_id: &str) -> GridEditResult {
        let tr = GridPatterns::new(manager.store()).edit_remove(gp_id)?;
        manager.apply_untracked(tr);
        manager.signal(Signal::GridPatternList);
        if self.selected.as_deref() == Some(gp_id) {
            self.select(manager, None);
        }
        Ok(())
    }

    fn modify(
        &mut self,
        manager: &mut SheetManager,
        f: impl FnOnce(&mut GridPattern) -> GridEditResult,
    ) -> GridEditResult {
        let Some(gp_id) = self.selected.clone() else {
            return Ok(());
        };
        let patterns = GridPatterns::new(manager.store());
        let mut gp = patterns
            .get(&gp_id)
            .ok_or_else(|| GridPatternError::UnknownId(gp_id.clone()))?;
        let before = gp.clone();
        f(&mut gp)?;
        if gp == before {
            return Ok(());
        }
        let tr = patterns.edit_set(&gp_id, &gp)?;
        manager.apply_untracked(tr);
        if before.name != gp.name {
            manager.signal(Signal::GridPatternList);
        }
        Ok(())
    }

    pub fn set_name(&mut self, manager: &mut SheetManager, name: &str) -> GridEditResult {
        self.modify(manager, |gp| {
            gp.name = name.to_string();
            Ok(())
        })
    }

    /// Lines at or past the new length are dropped.
    pub fn set_length(&mut self, manager: &mut SheetManager, length: Tstamp) -> GridEditResult {
        self.modify(manager, |gp| {
            gp.length = length;
            gp.lines.retain(|l| l.ts < length);
            Ok(())
        })?;
        if self.selected_line.is_some_and(|ts| ts >= length) {
            self.select_line(manager, None);
        }
        Ok(())
    }

    pub fn set_offset(&mut self, manager: &mut SheetManager, offset: Tstamp) -> GridEditResult {
        self.modify(manager, |gp| {
            gp.offset = offset;
            Ok(())
        })
    }

    pub fn add_line(&mut self, manager: &mut SheetManager, ts: Tstamp, style: usize) -> GridEditResult {
        self.modify(manager, |gp| {
            if gp.line_at(ts).is_some() {
                return Ok(());
            }
            let pos = gp.lines.partition_point(|l| l.ts < ts);
            gp.lines.insert(pos, GridLine { ts, style });
            Ok(())
        })?;
        self.select_line(manager, Some(ts));
        Ok(())
    }

    /// Remove the selected line. The style-0 line cannot be removed.
    pub fn remove_selected_line(&mut self, manager: &mut SheetManager) -> GridEditResult {
        let Some(ts) = self.selected_line else {
            return Ok(());
        };
        self.modify(manager, |gp| {
            if gp.line_at(ts).is_none() {
                return Err(GridPatternError::LineNotFound(ts));
            }
            gp.lines.retain(|l| l.ts != ts);
            Ok(())
        })?;
        self.select_line(manager, None);
        Ok(())
    }

    /// Move the selected line to `to`, keeping it selected.
    pub fn move_selected_line(&mut self, manager: &mut SheetManager, to: Tstamp) -> GridEditResult {
        let Some(from) = self.selected_line else {
            return Ok(());
        };
        self.modify(manager, |gp| {
            let line = *gp.line_at(from).ok_or(GridPatternError::LineNotFound(from))?;
            if from != to && gp.line_at(to).is_some() {
                return Err(GridPatternError::LinesNotAscending);
            }
            gp.lines.retain(|l| l.ts != from);
            let pos = gp.lines.partition_point(|l| l.ts < to);
            gp.lines.insert(pos, GridLine { ts: to, ..line });
            Ok(())
        })?;
        self.select_line(manager, Some(to));
        Ok(())
    }

    pub fn set_selected_line_style(&mut self, manager: &mut SheetManager, style: usize) -> GridEditResult {
        let Some(ts) = self.selected_line else {
            return Ok(());
        };
        self.modify(manager, |gp| {
            let line = gp
                .lines
                .iter_mut()
                .find(|l| l.ts == ts)
                .ok_or(GridPatternError::LineNotFound(ts))?;
            line.style = style;
            Ok(())
        })
    }

    pub fn set_style_spacing(&mut self, manager: &mut SheetManager, style: usize, value: f64) -> GridEditResult {
        if style >= STYLE_COUNT {
            return Err(GridPatternError::InvalidStyle(style));
        }
        self.modify(manager, |gp| {
            gp.min_style_spacing[style] = value;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetConfig;

    fn setup() -> (SheetManager, GridEditor, String) {
        let mut manager = SheetManager::new(SheetConfig::default());
        let mut editor = GridEditor::new();
        let id = editor.add_pattern(&mut manager, "Triplets").unwrap();
        (manager, editor, id)
    }

    #[test]
    fn add_selects_and_signals() {
        let (mut m, editor, id) = setup();
        assert_eq!(id, "gp_00");
        assert_eq!(editor.selected(), Some("gp_00"));
        let signals = m.perform_updates();
        assert!(signals.contains(&Signal::GridPatternList));
        assert!(signals.contains(&Signal::GridPatternSelection));
        assert!(!m.can_undo());
    }

    #[test]
    fn second_pattern_gets_fresh_id() {
        let (mut m, mut editor, _) = setup();
        assert_eq!(editor.add_pattern(&mut m, "B").unwrap(), "gp_01");
    }

    #[test]
    fn line_editing() {
        let (mut m, mut editor, _) = setup();
        let third = Tstamp::from_beats(1) / 3;
        editor.add_line(&mut m, third, 5).unwrap();
        assert_eq!(editor.selected_line(), Some(third));
        editor.set_selected_line_style(&mut m, 6).unwrap();
        let gp = editor.selected_pattern(&m).unwrap();
        assert_eq!(gp.line_at(third).map(|l| l.style), Some(6));

        let to = third + Tstamp::new(0, 1);
        editor.move_selected_line(&mut m, to).unwrap();
        let gp = editor.selected_pattern(&m).unwrap();
        assert!(gp.line_at(third).is_none());
        assert!(gp.line_at(to).is_some());

        editor.remove_selected_line(&mut m).unwrap();
        assert!(editor.selected_pattern(&m).unwrap().line_at(to).is_none());
    }

    #[test]
    fn invalid_edits_leave_store_untouched() {
        let (mut m, mut editor, _) = setup();
        let before = m.store().clone();

        editor.select_line(&mut m, Some(Tstamp::ZERO));
        assert_eq!(
            editor.remove_selected_line(&mut m),
            Err(GridPatternError::MissingMajorLine)
        );
        assert_eq!(
            editor.set_selected_line_style(&mut m, STYLE_COUNT),
            Err(GridPatternError::InvalidStyle(STYLE_COUNT))
        );
        assert!(editor.set_length(&mut m, Tstamp::new(0, 5)).is_err());
        assert!(editor.set_style_spacing(&mut m, 2, 0.0).is_err());
        assert!(editor.set_offset(&mut m, Tstamp::from_beats(-1)).is_err());
        assert_eq!(m.store(), &before);
    }

    #[test]
    fn shrinking_drops_lines() {
        let (mut m, mut editor, _) = setup();
        editor.set_length(&mut m, Tstamp::from_beats(2)).unwrap();
        editor.add_line(&mut m, Tstamp::new(1, 5), 1).unwrap();
        editor.set_length(&mut m, Tstamp::from_beats(1)).unwrap();
        assert_eq!(editor.selected_line(), None);
        let gp = editor.selected_pattern(&m).unwrap();
        assert!(gp.lines.iter().all(|l| l.ts < Tstamp::from_beats(1)));
    }

    #[test]
    fn remove_clears_selection() {
        let (mut m, mut editor, id) = setup();
        editor.remove_pattern(&mut m, &id).unwrap();
        assert_eq!(editor.selected(), None);
        assert!(GridPatterns::new(m.store()).ids().is_empty());
        assert_eq!(
            editor.remove_pattern(&mut m, &id),
            Err(GridPatternError::UnknownId(id))
        );
    }

    #[test]
    fn manager_grid_sees_edits() {
        let (mut m, mut editor, id) = setup();
        let cached = m.grid().resolve(m.store(), Some(&id));
        assert_eq!(Some(cached), editor.selected_pattern(&m));

        editor.set_length(&mut m, Tstamp::from_beats(2)).unwrap();
        let gp = m.grid().resolve(m.store(), Some(&id));
        assert_eq!(gp.length, Tstamp::from_beats(2));
    }
}
