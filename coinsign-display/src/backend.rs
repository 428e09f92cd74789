//! Render backend trait and geometry types
//!
//! Defines the interface the action/scheduler core draws through. The
//! coordinate origin is the top-left corner; actions may draw outside the
//! visible area during transitions and backends are expected to clip.

use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A position or direction vector in display pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Coords {
    pub x: i32,
    pub y: i32,
}

impl Coords {
    /// Origin (0, 0)
    pub const ZERO: Coords = Coords { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Coords {
    type Output = Coords;

    fn add(self, rhs: Coords) -> Coords {
        Coords::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Coords {
    fn add_assign(&mut self, rhs: Coords) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Coords {
    type Output = Coords;

    fn sub(self, rhs: Coords) -> Coords {
        Coords::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Coords {
    fn sub_assign(&mut self, rhs: Coords) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<i32> for Coords {
    type Output = Coords;

    fn mul(self, rhs: i32) -> Coords {
        Coords::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Coords {
    type Output = Coords;

    fn neg(self) -> Coords {
        Coords::new(-self.x, -self.y)
    }
}

/// Opaque font handle
///
/// The index is interpreted by the backend; the core only forwards it.
/// Index 0 is the backend's default face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Font(pub u8);

impl Font {
    /// Backend default face
    pub const DEFAULT: Font = Font(0);
    /// Condensed face used for long scrolling text
    pub const SMALL: Font = Font(1);
    /// Tiny face used by the settings menu
    pub const TINY: Font = Font(2);
}

/// Render backend trait
///
/// Provides a hardware-agnostic interface for drawing display content.
/// All drawing goes into the backend's frame buffer; flushing to the
/// panel is the board driver's concern and happens outside the core.
pub trait RenderTarget {
    /// Display width in pixels
    fn width(&self) -> i32;

    /// Display height in pixels
    fn height(&self) -> i32;

    /// Rendered width of `text` in pixels
    ///
    /// `None` selects the current font.
    fn text_width(&self, text: &str, font: Option<Font>) -> i32;

    /// Ascent of the given font in pixels (baseline placement)
    fn font_ascent(&self, font: Option<Font>) -> i32;

    /// Clear the frame buffer
    fn clear(&mut self);

    /// Draw text with its top-left corner at `coords`
    fn draw_text(&mut self, coords: Coords, text: &str, font: Option<Font>);

    /// Draw a single glyph (indicator arrows, ATH marker)
    fn draw_glyph(&mut self, coords: Coords, glyph: char, font: Option<Font>);

    /// Draw a packed 1-bit bitmap of `width` x `height` pixels
    fn draw_bitmap(&mut self, coords: Coords, width: i32, height: i32, data: &[u8]);

    /// Draw a line between two points
    fn draw_line(&mut self, from: Coords, to: Coords);

    /// Fill a rectangle
    fn fill_rect(&mut self, coords: Coords, width: i32, height: i32);

    /// Set panel brightness (hardware scale, 0-255)
    fn set_brightness(&mut self, level: u8);

    /// Rotate output by 180 degrees
    fn set_rotation(&mut self, flipped: bool);

    /// Select the font used when a draw call passes `None`
    fn set_font(&mut self, font: Font);
}
