//! Rasterization of the sheet: pixel geometry, software pixmaps, trigger
//! row images, and the column and ruler caches.

pub mod column_cache;
pub mod geometry;
pub mod pixmap;
pub mod ruler_cache;
pub mod trigger_row;

pub use column_cache::{ColumnCache, ColumnKey, RenderContext, StripKey, Variant};
pub use pixmap::{Pixmap, Rgb};
pub use ruler_cache::RulerCache;
pub use trigger_row::{BlockGlyphs, GlyphPainter, Notation, RowImageCache, TwelveTone};

use kunquat_types::PatInstRef;

use crate::state::{Album, Selection, SessionState, Store};

/// The pattern instance drawn in the active variant: the one under the
/// playback cursor while following playback without recording, otherwise
/// the one under the edit cursor.
pub fn active_pattern_instance(
    store: &Store,
    session: &SessionState,
    selection: &Selection,
) -> Option<PatInstRef> {
    let album = Album::new(store);
    if session.is_following_playback() {
        if let Some(cursor) = session.playback_cursor {
            return album.pattern_instance(cursor.track, cursor.system);
        }
    }
    let loc = selection.location();
    album.pattern_instance(loc.track, loc.system)
}
