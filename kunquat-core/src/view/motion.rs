//! Key-repeat state machines for cursor motion.
//!
//! A press in a new direction yields a step of one unit and arms a snap
//! delay; while the delay runs down, repeated presses keep stepping by one,
//! after which the step grows by one unit per repeat up to a maximum.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    pub fn sign(self) -> i64 {
        match self {
            Direction::Backward => -1,
            Direction::Forward => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Motion {
    snap_delay: u32,
    max_delta: i64,
    pressed: Option<Direction>,
    delay_left: u32,
    delta: i64,
}

impl Motion {
    pub fn new(snap_delay: u32, max_delta: i64) -> Self {
        Self {
            snap_delay,
            max_delta: max_delta.max(1),
            pressed: None,
            delay_left: 0,
            delta: 0,
        }
    }

    /// Signed step for this press.
    pub fn press(&mut self, dir: Direction) -> i64 {
        if self.pressed != Some(dir) {
            self.pressed = Some(dir);
            self.delay_left = self.snap_delay;
            self.delta = 1;
        } else if self.delay_left > 0 {
            self.delay_left -= 1;
        } else {
            self.delta = (self.delta + 1).min(self.max_delta);
        }
        dir.sign() * self.delta
    }

    pub fn release(&mut self) {
        self.pressed = None;
        self.delay_left = 0;
        self.delta = 0;
    }

    /// Restart the snap delay, e.g. after landing on a trigger row.
    pub fn reset_snap_delay(&mut self) {
        self.delay_left = self.snap_delay;
        self.delta = self.delta.min(1);
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.is_some()
    }

    pub fn delta(&self) -> i64 {
        self.pressed.map_or(0, |d| d.sign() * self.delta)
    }
}

/// The vertical and horizontal cursor state machines.
#[derive(Debug, Clone)]
pub struct CursorMotion {
    pub vertical: Motion,
    pub horizontal: Motion,
}

impl CursorMotion {
    pub fn new(snap_delay: u32, max_move_delta: i64) -> Self {
        Self {
            vertical: Motion::new(snap_delay, max_move_delta),
            horizontal: Motion::new(0, 1),
        }
    }

    pub fn press_up(&mut self) -> i64 {
        self.vertical.press(Direction::Backward)
    }

    pub fn press_down(&mut self) -> i64 {
        self.vertical.press(Direction::Forward)
    }

    pub fn release_up(&mut self) {
        self.vertical.release();
    }

    pub fn release_down(&mut self) {
        self.vertical.release();
    }

    pub fn press_left(&mut self) -> i64 {
        self.horizontal.press(Direction::Backward)
    }

    pub fn press_right(&mut self) -> i64 {
        self.horizontal.press(Direction::Forward)
    }

    pub fn release_left(&mut self) {
        self.horizontal.release();
    }

    pub fn release_right(&mut self) {
        self.horizontal.release();
    }
}
