//! Software ARGB rasters.

/// `0xrrggbb` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb(pub u32);

impl Rgb {
    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }

    pub fn from_channels(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Every channel multiplied by `factor`.
    pub fn scaled(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        let ch = |c: u8| (c as f32 * f).round() as u8;
        Self::from_channels(ch(self.r()), ch(self.g()), ch(self.b()))
    }

    fn argb(self) -> u32 {
        0xff00_0000 | (self.0 & 0x00ff_ffff)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u32>,
}

impl Pixmap {
    /// A transparent pixmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn filled(width: u32, height: u32, colour: Rgb) -> Self {
        let mut pixmap = Self::new(width, height);
        pixmap.fill(colour);
        pixmap
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Memory cost in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.len() * 4
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn pixel(&self, x: i64, y: i64) -> Option<u32> {
        self.index(x, y).map(|i| self.data[i])
    }

    /// Colour at `(x, y)`; transparent pixels read as `None`.
    pub fn colour_at(&self, x: i64, y: i64) -> Option<Rgb> {
        self.pixel(x, y)
            .filter(|p| p >> 24 != 0)
            .map(|p| Rgb(p & 0x00ff_ffff))
    }

    pub fn set_pixel(&mut self, x: i64, y: i64, colour: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.data[i] = colour.argb();
        }
    }

    pub fn fill(&mut self, colour: Rgb) {
        self.data.fill(colour.argb());
    }

    /// Fill a rectangle, clipped to the pixmap.
    pub fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, colour: Rgb) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width as i64);
        let y1 = (y + h).min(self.height as i64);
        let value = colour.argb();
        for row in y0..y1 {
            let start = row as usize * self.width as usize;
            for col in x0..x1 {
                self.data[start + col as usize] = value;
            }
        }
    }

    pub fn hline(&mut self, x0: i64, x1: i64, y: i64, colour: Rgb) {
        self.fill_rect(x0, y, x1 - x0, 1, colour);
    }

    pub fn vline(&mut self, x: i64, y0: i64, y1: i64, colour: Rgb) {
        self.fill_rect(x, y0, 1, y1 - y0, colour);
    }

    pub fn rect_outline(&mut self, x: i64, y: i64, w: i64, h: i64, colour: Rgb) {
        if w <= 0 || h <= 0 {
            return;
        }
        self.hline(x, x + w, y, colour);
        self.hline(x, x + w, y + h - 1, colour);
        self.vline(x, y, y + h, colour);
        self.vline(x + w - 1, y, y + h, colour);
    }

    /// Copy `src` over this pixmap at `(x, y)`. Transparent source pixels are
    /// skipped.
    pub fn draw(&mut self, src: &Pixmap, x: i64, y: i64) {
        self.compose(src, x, y, |_, s| s);
    }

    /// Add `src` channel-wise at `(x, y)`, saturating.
    pub fn add_blend(&mut self, src: &Pixmap, x: i64, y: i64) {
        self.compose(src, x, y, |d, s| {
            let add = |shift: u32| {
                let sum = ((d >> shift) & 0xff) + ((s >> shift) & 0xff);
                sum.min(0xff) << shift
            };
            0xff00_0000 | add(16) | add(8) | add(0)
        });
    }

    fn compose(&mut self, src: &Pixmap, x: i64, y: i64, op: impl Fn(u32, u32) -> u32) {
        for sy in 0..src.height as i64 {
            for sx in 0..src.width as i64 {
                let Some(si) = src.index(sx, sy) else {
                    continue;
                };
                let s = src.data[si];
                if s >> 24 == 0 {
                    continue;
                }
                if let Some(di) = self.index(x + sx, y + sy) {
                    self.data[di] = op(self.data[di], s);
                }
            }
        }
    }

    /// Scale every opaque pixel by `factor`.
    pub fn dim(&mut self, factor: f32) {
        for p in self.data.iter_mut().filter(|p| **p >> 24 != 0) {
            *p = Rgb(*p).scaled(factor).argb();
        }
    }

    /// Swap `a` and `b` inside a rectangle; other colours are left alone.
    pub fn swap_colours(&mut self, x: i64, y: i64, w: i64, h: i64, a: Rgb, b: Rgb) {
        for row in y.max(0)..(y + h).min(self.height as i64) {
            for col in x.max(0)..(x + w).min(self.width as i64) {
                if let Some(i) = self.index(col, row) {
                    let p = self.data[i];
                    if p == a.argb() {
                        self.data[i] = b.argb();
                    } else if p == b.argb() {
                        self.data[i] = a.argb();
                    }
                }
            }
        }
    }
}
