use std::ops::{Deref, DerefMut};

use super::manager::SheetManager;

/// Scoped multi-edit gesture.
///
/// While any gesture (or chord mode) is active, edits accumulate in one open
/// history step. Dropping the last guard commits the step.
///
/// ```ignore
/// let mut gesture = manager.begin_gesture();
/// gesture.add_trigger(a)?;
/// gesture.add_trigger(b)?;
/// // committed here
/// ```
pub struct Gesture<'a> {
    manager: &'a mut SheetManager,
}

impl<'a> Gesture<'a> {
    pub(crate) fn new(manager: &'a mut SheetManager) -> Self {
        manager.push_deferral();
        Self { manager }
    }
}

impl Deref for Gesture<'_> {
    type Target = SheetManager;

    fn deref(&self) -> &SheetManager {
        self.manager
    }
}

impl DerefMut for Gesture<'_> {
    fn deref_mut(&mut self) -> &mut SheetManager {
        self.manager
    }
}

impl Drop for Gesture<'_> {
    fn drop(&mut self) {
        self.manager.pop_deferral();
    }
}
