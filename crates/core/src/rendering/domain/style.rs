use std::fmt;
use std::str::FromStr;

pub const DEFAULT_FONT_SIZE: u32 = 64;
/// Largest font size, in pixels, a style may ask for.
pub const MAX_FONT_SIZE: u32 = 2048;
/// Thickest outline, in pixels, a style may ask for.
pub const MAX_OUTLINE_RADIUS: u32 = 64;
pub const DEFAULT_TEXT_COLOR: Rgb = Rgb(255, 255, 0);
pub const DEFAULT_OUTLINE_COLOR: Rgb = Rgb(0, 0, 0);

/// An opaque 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn channels(self) -> [u8; 3] {
        [self.0, self.1, self.2]
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parses `RRGGBB`, optionally prefixed with `#`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("expected a colour like 'ffff00' or '#ffff00', got '{s}'"));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Pixel the caption's ink box is centred on, measured from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn frame_center(width: u32, height: u32) -> Self {
        Self {
            x: (width / 2) as i32,
            y: (height / 2) as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlineStyle {
    pub enabled: bool,
    pub color: Rgb,
    pub radius: u32,
}

impl OutlineStyle {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            color: DEFAULT_OUTLINE_COLOR,
            radius: 0,
        }
    }

    pub fn new(color: Rgb, radius: u32) -> Self {
        Self {
            enabled: radius > 0,
            color,
            radius,
        }
    }

    /// Radius actually drawn; zero when the outline is off and never more
    /// than [`MAX_OUTLINE_RADIUS`].
    pub fn effective_radius(&self) -> u32 {
        if self.enabled {
            self.radius.min(MAX_OUTLINE_RADIUS)
        } else {
            0
        }
    }
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self::disabled()
    }
}

/// How captions look for a whole render pass. Passed explicitly to every
/// render call; nothing reads styling from global state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleConfig {
    pub color: Rgb,
    pub font_size: u32,
    pub anchor: Anchor,
    pub outline: OutlineStyle,
}

impl StyleConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.font_size == 0 {
            return Err("font_size must be a positive integer".to_string());
        }
        if self.font_size > MAX_FONT_SIZE {
            return Err(format!(
                "font_size {} exceeds the limit of {MAX_FONT_SIZE}",
                self.font_size
            ));
        }
        if self.outline.enabled && self.outline.radius > MAX_OUTLINE_RADIUS {
            return Err(format!(
                "outline radius {} exceeds the limit of {MAX_OUTLINE_RADIUS}",
                self.outline.radius
            ));
        }
        Ok(())
    }
}
