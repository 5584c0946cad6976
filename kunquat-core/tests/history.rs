//! Undo/redo and clipboard properties over random edit sequences.

mod common;

use common::*;
use kunquat_core::SheetManager;
use kunquat_types::{ts, Trigger, Tstamp};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Insert { col: usize, beat: i64, index: usize, cents: i32 },
    Remove { col: usize, beat: i64, index: usize },
    Length { beats: i64 },
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..4, 0i64..8, 0usize..3, -2400i32..2400).prop_map(|(col, beat, index, cents)| {
            Edit::Insert {
                col,
                beat,
                index,
                cents,
            }
        }),
        (0usize..4, 0i64..8, 0usize..3).prop_map(|(col, beat, index)| Edit::Remove { col, beat, index }),
        (1i64..12).prop_map(|beats| Edit::Length { beats }),
    ]
}

fn apply(m: &mut SheetManager, edit: &Edit) -> bool {
    match *edit {
        Edit::Insert {
            col,
            beat,
            index,
            cents,
        } => {
            m.set_location(pos(col, ts(beat, 0), index));
            let before = m.history().past_len();
            m.add_trigger(Trigger::new("n+", Some(cents.to_string())))
                .is_ok()
                && m.history().past_len() > before
        }
        Edit::Remove { col, beat, index } => {
            m.set_location(pos(col, ts(beat, 0), index));
            m.try_remove_trigger()
        }
        Edit::Length { beats } => m.set_pattern_length(0, Tstamp::from_beats(beats)),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_all_then_redo_all(edits in prop::collection::vec(edit(), 1..24)) {
        let mut m = single_pattern(8).manager();
        let original = m.store().clone();
        let mut steps = 0;
        for e in &edits {
            if apply(&mut m, e) {
                steps += 1;
            }
        }
        let edited = m.store().clone();
        prop_assert_eq!(m.history().past_len(), steps);

        for _ in 0..steps {
            prop_assert!(m.undo());
        }
        prop_assert!(!m.can_undo());
        prop_assert_eq!(m.store(), &original);

        for _ in 0..steps {
            prop_assert!(m.redo());
        }
        prop_assert!(!m.can_redo());
        prop_assert_eq!(m.store(), &edited);
    }

    #[test]
    fn rows_stay_sorted_and_nonempty(edits in prop::collection::vec(edit(), 1..24)) {
        let mut m = single_pattern(8).manager();
        for e in &edits {
            apply(&mut m, e);
        }
        for col in 0..4 {
            let column = m.column_at(0, 0, col).unwrap();
            let rows = column.trigger_row_positions();
            prop_assert!(rows.windows(2).all(|w| w[0] < w[1]));
            for r in rows {
                prop_assert!(!column.row(r).is_empty());
            }
        }
    }
}

#[test]
fn rect_copy_paste_reproduces_columns() {
    let mut m = single_pattern(16)
        .trigger(0, 0, ts(0, 0), note_on("0"))
        .trigger(0, 0, ts(1, 0), note_on("100"))
        .trigger(0, 0, ts(1, 0), note_off())
        .trigger(0, 2, ts(2, 0), Trigger::new(".f", Some("-6".into())))
        .manager();
    m.set_area(pos(0, ts(0, 0), 0), pos(2, ts(4, 0), 0));
    let data = m.copy_selected_area().unwrap();
    m.clear_area();
    m.set_location(pos(3, ts(8, 0), 0));
    m.paste(&data).unwrap();

    for col in 0..3 {
        let src = m.column_at(0, 0, col).unwrap();
        let dst = m.column_at(0, 0, col + 3).unwrap();
        let shifted: Vec<Tstamp> = src
            .trigger_row_positions()
            .into_iter()
            .map(|t| t + ts(8, 0))
            .collect();
        assert_eq!(dst.trigger_row_positions(), shifted);
        for t in src.trigger_row_positions() {
            assert_eq!(dst.row(t + ts(8, 0)), src.row(t));
        }
    }
}

#[test]
fn invalid_paste_records_nothing() {
    let mut m = single_pattern(4).manager();
    assert!(m.paste("{\"nope\": 1}").is_err());
    assert!(m.paste("not json").is_err());
    assert!(!m.can_undo());
}

#[test]
fn chord_mode_is_one_step() {
    let mut m = single_pattern(4).manager();
    m.set_location(pos(0, ts(1, 0), 0));
    m.set_chord_mode(true);
    for cents in ["0", "400", "700"] {
        m.add_trigger(note_on(cents)).unwrap();
    }
    m.set_chord_mode(false);
    for col in 0..3 {
        assert_eq!(row(&m, col, ts(1, 0)).len(), 1);
    }
    assert_eq!(m.history().past_len(), 1);
    assert_eq!(m.selection().location(), pos(0, ts(1, 0), 1));

    assert!(m.undo());
    for col in 0..3 {
        assert!(row(&m, col, ts(1, 0)).is_empty());
    }
}
