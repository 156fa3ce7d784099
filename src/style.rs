//! Colour handling for page backgrounds.
//!
//! Only the forms a computed-style query actually returns are supported:
//! `#rgb`, `#rrggbb`, `rgb(...)`, `rgba(...)` and `transparent`.

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else if hex.len() == 3 {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else {
            None
        }
    }

    /// Parse a CSS colour value as returned by a computed-style query.
    pub fn from_css(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        if v == "transparent" {
            return Some(Self::TRANSPARENT);
        }
        if v.starts_with('#') {
            return Self::from_hex(&v);
        }
        let inner = v
            .strip_prefix("rgba(")
            .or_else(|| v.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let parts: Vec<&str> = inner
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let channel = |s: &str| -> Option<f32> {
            let n: f32 = s.parse().ok()?;
            Some((n / 255.0).clamp(0.0, 1.0))
        };
        let a = match parts.get(3) {
            Some(s) => parse_alpha(s)?,
            None => 1.0,
        };
        Some(Self {
            r: channel(parts[0])?,
            g: channel(parts[1])?,
            b: channel(parts[2])?,
            a,
        })
    }

    /// Resolve a page background: missing, invalid or transparent → white.
    pub fn page_background(value: Option<&str>) -> Self {
        match value.and_then(Self::from_css) {
            Some(c) if !c.is_transparent() => c,
            Some(_) | None => {
                if let Some(v) = value {
                    log::debug!("Background {v:?} unusable, falling back to white");
                }
                Self::WHITE
            }
        }
    }

    /// Opaque 8-bit channels, ignoring alpha.
    pub fn to_rgb8(&self) -> [u8; 3] {
        [
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
        ]
    }
}

fn parse_alpha(s: &str) -> Option<f32> {
    let a = match s.strip_suffix('%') {
        Some(pct) => pct.parse::<f32>().ok()? / 100.0,
        None => s.parse::<f32>().ok()?,
    };
    Some(a.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_from_hex() {
        let c = Color::from_hex("#ff8800").unwrap();
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
    }

    #[test]
    fn computed_rgb_values() {
        let c = Color::from_css("rgb(255, 0, 51)").unwrap();
        assert_eq!(c.to_rgb8(), [255, 0, 51]);
        let c = Color::from_css("rgba(10, 20, 30, 0.5)").unwrap();
        assert!((c.a - 0.5).abs() < 1e-6);
        let c = Color::from_css("rgb(10 20 30 / 50%)").unwrap();
        assert!((c.a - 0.5).abs() < 1e-6);
    }

    #[test]
    fn transparent_backgrounds_become_white() {
        assert_eq!(Color::page_background(Some("rgba(0, 0, 0, 0)")), Color::WHITE);
        assert_eq!(Color::page_background(Some("transparent")), Color::WHITE);
        assert_eq!(Color::page_background(Some("not-a-colour")), Color::WHITE);
        assert_eq!(Color::page_background(None), Color::WHITE);
    }

    #[test]
    fn opaque_background_is_kept() {
        let c = Color::page_background(Some("#1e1e1e"));
        assert_eq!(c.to_rgb8(), [30, 30, 30]);
    }
}
