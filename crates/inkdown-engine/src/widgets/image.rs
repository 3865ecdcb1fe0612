//! Image resizing: live drag state and the `=WIDTHx` markdown rewrite.

use regex::Regex;

pub const MIN_WIDTH: u32 = 100;
/// Space kept free between a resized image and the surface edge.
pub const EDGE_MARGIN: u32 = 40;

/// Upsert `=WIDTHx` on every image whose typed path is `original_path`.
/// Returns `None` when no image matched.
pub fn set_width(source: &str, original_path: &str, width: u32) -> Option<String> {
    let pattern = format!(
        r"!\[([^\]]*)\]\({}(?:\s*=\d+x?)?\)",
        regex::escape(original_path)
    );
    let re = Regex::new(&pattern).ok()?;
    if !re.is_match(source) {
        return None;
    }
    let replaced = re.replace_all(source, |caps: &regex::Captures| {
        format!("![{}]({original_path} ={width}x)", &caps[1])
    });
    Some(replaced.into_owned())
}

/// An in-progress drag of a resize handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageResize {
    start_x: f64,
    start_width: u32,
    surface_width: u32,
    width: u32,
}

impl ImageResize {
    pub fn begin(start_x: f64, start_width: u32, surface_width: u32) -> Self {
        Self {
            start_x,
            start_width,
            surface_width,
            width: start_width,
        }
    }

    /// Width shown while the pointer is at `x`.
    pub fn drag_to(&mut self, x: f64) -> u32 {
        let proposed = f64::from(self.start_width) + (x - self.start_x);
        let max = f64::from(self.surface_width.saturating_sub(EDGE_MARGIN));
        let clamped = proposed.min(max).max(f64::from(MIN_WIDTH));
        self.width = clamped.round() as u32;
        self.width
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_set_width_adds_suffix() {
        let updated = set_width("a ![cat](img/cat.png) b", "img/cat.png", 320).unwrap();
        assert_eq!(updated, "a ![cat](img/cat.png =320x) b");
    }

    #[test]
    fn test_set_width_replaces_existing_suffix() {
        let updated = set_width("![cat](cat.png =100x)\n![dog](dog.png)", "cat.png", 250).unwrap();
        assert_eq!(updated, "![cat](cat.png =250x)\n![dog](dog.png)");
    }

    #[test]
    fn test_set_width_escapes_path() {
        let source = "![x](a+b (1).png)";
        assert_eq!(set_width(source, "a+b", 200), None);
        assert_eq!(set_width("![x](a.png)", "a+png", 200), None);
    }

    #[test]
    fn test_set_width_unknown_path() {
        assert_eq!(set_width("![cat](cat.png)", "dog.png", 200), None);
    }

    #[rstest]
    #[case(50.0, 350)]
    #[case(-500.0, MIN_WIDTH)]
    #[case(10_000.0, 760)]
    fn test_drag_clamps(#[case] dx: f64, #[case] expected: u32) {
        let mut resize = ImageResize::begin(10.0, 300, 800);
        assert_eq!(resize.drag_to(10.0 + dx), expected);
        assert_eq!(resize.width(), expected);
    }

    #[test]
    fn test_narrow_surface_keeps_minimum() {
        let mut resize = ImageResize::begin(0.0, 120, 90);
        assert_eq!(resize.drag_to(30.0), MIN_WIDTH);
    }
}
