//! Color mapping utilities for layer styling and heat intensity.

use std::fmt;

use crate::types::Category;

/// Simple RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }

    /// Format as hex: #rrggbb
    pub fn to_hex(&self) -> String { format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b) }

    fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round().clamp(0.0, 255.0) as u8;
        Rgb { r: mix(a.r, b.r), g: mix(a.g, b.g), b: mix(a.b, b.b) }
    }
}

impl fmt::Display for Rgb {
    /// Format as CSS: rgb(r,g,b)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Heat ramp for intensity in [0.0, 1.0]: blue, cyan, lime, yellow, red.
pub fn heat_color(intensity: f64) -> Rgb {
    // Handle NaN / infinities: fall back to the coolest color.
    if !intensity.is_finite() { return Rgb::new(0, 0, 255) }

    let x = intensity.clamp(0.0, 1.0);

    const STOPS: &[(f64, Rgb)] = &[
        (0.00, Rgb::new(  0,   0, 255)),
        (0.25, Rgb::new(  0, 255, 255)),
        (0.50, Rgb::new(  0, 255,   0)),
        (0.75, Rgb::new(255, 255,   0)),
        (1.00, Rgb::new(255,   0,   0)),
    ];

    for pair in STOPS.windows(2) {
        let ((lo, a), (hi, b)) = (pair[0], pair[1]);
        if x <= hi { return Rgb::lerp(a, b, (x - lo) / (hi - lo)) }
    }
    Rgb::new(255, 0, 0)
}

/// Fixed marker color per category.
pub fn category_color(category: Category) -> Rgb {
    match category {
        Category::CollectionPoint => Rgb::new(37, 99, 235),
        Category::ReduceReuseRecycle => Rgb::new(22, 163, 74),
        Category::WasteBank => Rgb::new(234, 179, 8),
        Category::Composting => Rgb::new(133, 77, 14),
        Category::UnauthorizedDump => Rgb::new(220, 38, 38),
        Category::AdministrativeBoundary => Rgb::new(100, 116, 139),
        Category::Unknown => Rgb::new(150, 150, 150),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints_and_midpoint() {
        assert_eq!(heat_color(0.0), Rgb::new(0, 0, 255));
        assert_eq!(heat_color(0.5), Rgb::new(0, 255, 0));
        assert_eq!(heat_color(1.0), Rgb::new(255, 0, 0));
        assert_eq!(heat_color(7.0), Rgb::new(255, 0, 0));
        assert_eq!(heat_color(f64::NAN), Rgb::new(0, 0, 255));
    }

    #[test]
    fn formats_as_css_and_hex() {
        let c = Rgb::new(255, 16, 0);
        assert_eq!(c.to_string(), "rgb(255,16,0)");
        assert_eq!(c.to_hex(), "#ff1000");
    }
}
