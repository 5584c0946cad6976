//! Layout and memoized images of trigger rows.
//!
//! A row is laid out left to right as one block per trigger: the type field,
//! then the argument field if the trigger has one. Identically shaped rows
//! share one image in [`RowImageCache`].

use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;

use kunquat_types::events::{self, parse_float, parse_int};
use kunquat_types::{ArgType, Trigger};

use super::pixmap::{Pixmap, Rgb};
use crate::config::Colours;

/// Draws text into pixmaps.
pub trait GlyphPainter {
    fn char_width(&self) -> u32;

    fn line_height(&self) -> u32;

    fn text_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.char_width()
    }

    fn paint_text(&self, pixmap: &mut Pixmap, x: i64, y: i64, text: &str, colour: Rgb);
}

/// Paints a solid block per visible character.
#[derive(Debug, Clone, Copy)]
pub struct BlockGlyphs {
    pub char_width: u32,
    pub line_height: u32,
}

impl GlyphPainter for BlockGlyphs {
    fn char_width(&self) -> u32 {
        self.char_width
    }

    fn line_height(&self) -> u32 {
        self.line_height
    }

    fn paint_text(&self, pixmap: &mut Pixmap, x: i64, y: i64, text: &str, colour: Rgb) {
        let cw = self.char_width as i64;
        let h = self.line_height as i64;
        for (i, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            pixmap.fill_rect(x + i as i64 * cw + 1, y + 2, cw - 2, h - 4, colour);
        }
    }
}

/// Display names of pitches and hits.
pub trait Notation {
    fn note_name(&self, cents: f64) -> String;

    fn hit_name(&self, index: i64) -> Option<String>;
}

/// Twelve-tone equal temperament with 0 cents at A4.
#[derive(Debug, Clone, Default)]
pub struct TwelveTone {
    pub hit_names: Vec<(i64, String)>,
}

impl Notation for TwelveTone {
    fn note_name(&self, cents: f64) -> String {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        let semitones = (cents / 100.0).round() as i64;
        let from_c = semitones + 9;
        let name = NAMES[from_c.rem_euclid(12) as usize];
        let octave = 4 + from_c.div_euclid(12);
        let dev = (cents - semitones as f64 * 100.0).round() as i64;
        if dev == 0 {
            format!("{}{}", name, octave)
        } else {
            format!("{}{}{:+}", name, octave, dev)
        }
    }

    fn hit_name(&self, index: i64) -> Option<String> {
        self.hit_names
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, name)| name.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Type,
    Argument,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub kind: FieldKind,
    pub text: String,
    pub x: u32,
    pub width: u32,
}

/// Laid-out trigger, with fields relative to the row start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerLayout {
    pub trigger_type: String,
    pub argument: Option<String>,
    pub warn: bool,
    pub hit: bool,
    pub x: u32,
    pub width: u32,
    pub fields: Vec<Field>,
}

fn argument_text(trigger: &Trigger, notation: &dyn Notation) -> Option<String> {
    let arg = trigger.argument()?;
    let shown = match trigger.arg_type() {
        Some(ArgType::Pitch) => parse_float(arg).map(|c| notation.note_name(c)),
        _ if trigger.trigger_type() == events::HIT => {
            parse_int(arg).and_then(|i| notation.hit_name(i))
        }
        _ => None,
    };
    Some(shown.unwrap_or_else(|| arg.to_string()))
}

pub fn layout_row(
    triggers: &[Trigger],
    notation: &dyn Notation,
    glyphs: &dyn GlyphPainter,
    padding: u32,
) -> Vec<TriggerLayout> {
    let mut x = 0;
    let mut out = Vec::with_capacity(triggers.len());
    for trigger in triggers {
        let start = x;
        let mut fields = Vec::new();
        let mut push = |kind, text: String| {
            let width = glyphs.text_width(&text) + 2 * padding;
            fields.push(Field {
                kind,
                text,
                x,
                width,
            });
            x += width;
        };
        push(FieldKind::Type, trigger.trigger_type().to_string());
        if let Some(text) = argument_text(trigger, notation) {
            push(FieldKind::Argument, text);
        }
        x += padding;
        out.push(TriggerLayout {
            trigger_type: trigger.trigger_type().to_string(),
            argument: trigger.argument().map(str::to_string),
            warn: !trigger.is_valid(),
            hit: trigger.is_hit(),
            x: start,
            width: x - start,
            fields,
        });
    }
    out
}

pub fn row_width(layout: &[TriggerLayout]) -> u32 {
    layout.last().map_or(0, |t| t.x + t.width)
}

/// Index of the trigger whose block contains `x`, if any.
pub fn trigger_at_x(layout: &[TriggerLayout], x: i64) -> Option<usize> {
    layout
        .iter()
        .position(|t| x >= t.x as i64 && x < (t.x + t.width) as i64)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RowImageKey {
    layout: Vec<TriggerLayout>,
    inactive: bool,
}

impl RowImageKey {
    fn has_hit(&self) -> bool {
        self.layout.iter().any(|t| t.hit)
    }
}

pub struct RowImageCache {
    images: LruCache<RowImageKey, Rc<Pixmap>>,
}

impl RowImageCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            images: LruCache::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// Drop images of rows containing hits.
    pub fn flush_hits(&mut self) {
        let stale: Vec<RowImageKey> = self
            .images
            .iter()
            .filter(|(k, _)| k.has_hit())
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            self.images.pop(&key);
        }
    }

    pub fn get(
        &mut self,
        layout: &[TriggerLayout],
        inactive: bool,
        height: u32,
        glyphs: &dyn GlyphPainter,
        colours: &Colours,
        dim: f32,
    ) -> Rc<Pixmap> {
        let key = RowImageKey {
            layout: layout.to_vec(),
            inactive,
        };
        if let Some(image) = self.images.get(&key) {
            return image.clone();
        }
        let mut image = render_row(layout, height, glyphs, colours);
        if inactive {
            image.dim(dim);
        }
        let image = Rc::new(image);
        self.images.put(key, image.clone());
        image
    }
}

fn render_row(layout: &[TriggerLayout], height: u32, glyphs: &dyn GlyphPainter, colours: &Colours) -> Pixmap {
    let mut image = Pixmap::new(row_width(layout).max(1), height.max(1));
    let text_y = (height as i64 - glyphs.line_height() as i64) / 2;
    for trigger in layout {
        for field in &trigger.fields {
            let colour = match (trigger.warn, field.kind) {
                (true, _) => colours.trigger_warning,
                (false, FieldKind::Type) => colours.trigger_type,
                (false, FieldKind::Argument) => colours.trigger_argument,
            };
            let pad = (field.width - glyphs.text_width(&field.text)) / 2;
            glyphs.paint_text(&mut image, (field.x + pad) as i64, text_y, &field.text, colour);
        }
    }
    image
}
