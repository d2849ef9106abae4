//! # Popup Placement
//!
//! Decides which corner or edge of a detail popup attaches to its marker so
//! the popup stays inside the map container.
//!
//! Everything here is a pure function of pixel geometry. Recompute on every
//! popup open: the marker's screen position and the container size change
//! between opens.
//!
//! ## Rules
//!
//! Vertically the popup needs `popup.height + marker_height` pixels of
//! clearance, measured from the marker to the container edge minus `margin`:
//!
//! | Fits above | Fits below | Anchor | Renders |
//! |------------|------------|--------|---------|
//! | yes | no | bottom | above the marker |
//! | no | yes | top | below the marker |
//! | yes | yes | top | below the marker |
//! | no | no | side with strictly more room, else top | may clip |
//!
//! Horizontally the popup is centred unless less than half its width fits on
//! one side, in which case that edge anchors with a small inset.

use std::fmt;

/// A screen position in pixels, origin at the container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PixelSize {
    pub width: f64,
    pub height: f64,
}

impl PixelSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Tunables for [`resolve_anchor`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PlacementConfig {
    /// Gap kept between the popup and the container edge.
    /// Default: 20
    pub margin: f64,

    /// Height of the marker icon the popup must clear.
    /// Default: 50
    pub marker_height: f64,

    /// Horizontal nudge applied when the popup anchors to a side.
    /// Default: 10
    pub horizontal_inset: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            margin: 20.0,
            marker_height: 50.0,
            horizontal_inset: 10.0,
        }
    }
}

/// Which popup edge touches the marker vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum VerticalAnchor {
    /// Popup renders below the marker
    Top,
    /// Popup renders above the marker
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Result of [`resolve_anchor`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PopupPlacement {
    pub vertical: VerticalAnchor,
    pub horizontal: HorizontalAnchor,
    pub offset_x: f64,
    pub offset_y: f64,
    /// `false` when neither direction had enough room and the popup may clip
    pub fits_vertically: bool,
}

impl PopupPlacement {
    pub fn pixel_offset(&self) -> [f64; 2] {
        [self.offset_x, self.offset_y]
    }

    /// Combined anchor descriptor for map libraries that take one string.
    pub fn anchor(&self) -> PopupAnchor {
        PopupAnchor {
            vertical: self.vertical,
            horizontal: self.horizontal,
        }
    }

    /// Whether the popup stays fully inside the container.
    pub fn fits(&self) -> bool {
        self.fits_vertically
    }
}

/// Anchor descriptor such as `"top-left"`, or just `"bottom"` when centred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupAnchor {
    pub vertical: VerticalAnchor,
    pub horizontal: HorizontalAnchor,
}

impl PopupAnchor {
    pub fn as_str(&self) -> &'static str {
        use HorizontalAnchor::*;
        use VerticalAnchor::*;
        match (self.vertical, self.horizontal) {
            (Top, Center) => "top",
            (Top, Left) => "top-left",
            (Top, Right) => "top-right",
            (Bottom, Center) => "bottom",
            (Bottom, Left) => "bottom-left",
            (Bottom, Right) => "bottom-right",
        }
    }
}

impl fmt::Display for PopupAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Choose where a popup attaches to the marker at `marker`.
///
/// Never fails. When the popup fits in neither vertical direction the side
/// with strictly more room wins and [`PopupPlacement::fits`] reports `false`.
///
/// # Example
/// ```
/// use spatial_grouping::{resolve_anchor, PixelPoint, PixelSize, PlacementConfig};
///
/// let placement = resolve_anchor(
///     PixelPoint::new(500.0, 500.0),
///     PixelSize::new(1000.0, 800.0),
///     PixelSize::new(340.0, 280.0),
///     &PlacementConfig::default(),
/// );
/// // 480 px above, 280 px below, 330 px needed
/// assert_eq!(placement.anchor().to_string(), "bottom");
/// assert_eq!(placement.pixel_offset(), [0.0, -50.0]);
/// ```
pub fn resolve_anchor(
    marker: PixelPoint,
    container: PixelSize,
    popup: PixelSize,
    config: &PlacementConfig,
) -> PopupPlacement {
    let above = marker.y - config.margin;
    let below = container.height - marker.y - config.margin;
    let left = marker.x - config.margin;
    let right = container.width - marker.x - config.margin;

    let needed = popup.height + config.marker_height;
    let fits_above = above >= needed;
    let fits_below = below >= needed;

    let vertical = match (fits_above, fits_below) {
        (true, false) => VerticalAnchor::Bottom,
        (false, true) | (true, true) => VerticalAnchor::Top,
        (false, false) if above > below => VerticalAnchor::Bottom,
        (false, false) => VerticalAnchor::Top,
    };
    let offset_y = match vertical {
        VerticalAnchor::Bottom => -config.marker_height,
        VerticalAnchor::Top => config.marker_height,
    };

    let half_width = popup.width / 2.0;
    let (horizontal, offset_x) = if left < half_width {
        (HorizontalAnchor::Left, config.horizontal_inset)
    } else if right < half_width {
        (HorizontalAnchor::Right, -config.horizontal_inset)
    } else {
        (HorizontalAnchor::Center, 0.0)
    };

    PopupPlacement {
        vertical,
        horizontal,
        offset_x,
        offset_y,
        fits_vertically: fits_above || fits_below,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POPUP: PixelSize = PixelSize { width: 340.0, height: 280.0 };

    fn place(x: f64, y: f64, w: f64, h: f64) -> PopupPlacement {
        resolve_anchor(
            PixelPoint::new(x, y),
            PixelSize::new(w, h),
            POPUP,
            &PlacementConfig::default(),
        )
    }

    #[test]
    fn test_reference_scenario() {
        let placement = place(500.0, 500.0, 1000.0, 800.0);
        assert_eq!(placement.vertical, VerticalAnchor::Bottom);
        assert_eq!(placement.horizontal, HorizontalAnchor::Center);
        assert_eq!(placement.pixel_offset(), [0.0, -50.0]);
        assert_eq!(placement.anchor().as_str(), "bottom");
        assert!(placement.fits());
    }

    #[test]
    fn test_identical_inputs_give_identical_output() {
        let a = place(123.25, 456.5, 1000.0, 800.0);
        let b = place(123.25, 456.5, 1000.0, 800.0);
        assert_eq!(a, b);
        assert_eq!(a.offset_x.to_bits(), b.offset_x.to_bits());
        assert_eq!(a.offset_y.to_bits(), b.offset_y.to_bits());
    }

    #[test]
    fn test_vertical_flip_at_threshold() {
        // 330 px needed; a 699 px container leaves no y where both fit
        let at = place(500.0, 350.0, 1000.0, 699.0);
        assert_eq!(at.vertical, VerticalAnchor::Bottom);
        assert!(at.fits());

        let below = place(500.0, 349.0, 1000.0, 699.0);
        assert_eq!(below.vertical, VerticalAnchor::Top);
        assert_eq!(below.offset_y, 50.0);
        assert!(below.fits());
    }

    #[test]
    fn test_both_fit_prefers_rendering_below() {
        let placement = place(500.0, 400.0, 1000.0, 1000.0);
        assert_eq!(placement.vertical, VerticalAnchor::Top);
        assert_eq!(placement.offset_y, 50.0);
    }

    #[test]
    fn test_neither_fits_picks_roomier_side() {
        let up = place(500.0, 200.0, 1000.0, 300.0);
        assert_eq!(up.vertical, VerticalAnchor::Bottom);
        assert!(!up.fits());

        let down = place(500.0, 100.0, 1000.0, 300.0);
        assert_eq!(down.vertical, VerticalAnchor::Top);
        assert!(!down.fits());

        // Equal room falls back to rendering below
        let tie = place(500.0, 150.0, 1000.0, 300.0);
        assert_eq!(tie.vertical, VerticalAnchor::Top);
    }

    #[test]
    fn test_horizontal_edges() {
        let left = place(100.0, 500.0, 1000.0, 800.0);
        assert_eq!(left.horizontal, HorizontalAnchor::Left);
        assert_eq!(left.offset_x, 10.0);
        assert_eq!(left.anchor().to_string(), "bottom-left");

        let right = place(900.0, 100.0, 1000.0, 800.0);
        assert_eq!(right.horizontal, HorizontalAnchor::Right);
        assert_eq!(right.offset_x, -10.0);
        assert_eq!(right.anchor().to_string(), "top-right");
    }

    #[test]
    fn test_narrow_container_prefers_left() {
        // Neither side has half the width; left is checked first
        let placement = place(150.0, 500.0, 300.0, 800.0);
        assert_eq!(placement.horizontal, HorizontalAnchor::Left);
    }
}
