// Copyright 2025 the Shape Blur Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration values of a blur view.
//!
//! [`BlurConfig`] holds validated, typed values. [`BlurAttributes`] is the loose,
//! attribute-style input (every field optional) that a styling layer would produce; it
//! resolves into a [`BlurConfig`] with the documented defaults.

use crate::color::palette;
use crate::error::ConfigError;
use crate::kurbo::Vec2;
use crate::peniko::Color;

/// Default blur radius in pixels.
pub const DEFAULT_BLUR_RADIUS: f32 = 10.0;
/// Default ratio by which the view is shrunk before blurring.
pub const DEFAULT_DOWN_SAMPLE_FACTOR: f32 = 4.0;
/// Default color of the border stroke.
pub const DEFAULT_BORDER_COLOR: Color = palette::css::WHITE;

/// Build a color from a packed `0xAARRGGBB` value.
pub fn color_from_argb(argb: u32) -> Color {
    let [a, r, g, b] = argb.to_be_bytes();
    Color::from_rgba8(r, g, b, a)
}

/// Horizontal and vertical radii of the four corners of a rounded rectangle.
///
/// Corners are in clockwise order starting at the top left.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CornerRadii {
    /// Top-left corner.
    pub top_left: Vec2,
    /// Top-right corner.
    pub top_right: Vec2,
    /// Bottom-right corner.
    pub bottom_right: Vec2,
    /// Bottom-left corner.
    pub bottom_left: Vec2,
}

impl CornerRadii {
    /// No rounding.
    pub const ZERO: Self = Self::uniform(0.0);

    /// Circular corners with the given radius in clockwise order starting at the top left.
    pub const fn new(top_left: f64, top_right: f64, bottom_right: f64, bottom_left: f64) -> Self {
        Self {
            top_left: Vec2::new(top_left, top_left),
            top_right: Vec2::new(top_right, top_right),
            bottom_right: Vec2::new(bottom_right, bottom_right),
            bottom_left: Vec2::new(bottom_left, bottom_left),
        }
    }

    /// The same circular radius on all four corners.
    pub const fn uniform(radius: f64) -> Self {
        Self::new(radius, radius, radius, radius)
    }

    /// The corners in clockwise order starting at the top left.
    pub fn as_array(&self) -> [Vec2; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Whether every radius is zero.
    pub fn is_zero(&self) -> bool {
        self.as_array().iter().all(|r| r.x == 0.0 && r.y == 0.0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for radius in self.as_array() {
            for v in [radius.x, radius.y] {
                if !v.is_finite() || v < 0.0 {
                    return Err(ConfigError::InvalidCornerRadius(v as f32));
                }
            }
        }
        Ok(())
    }
}

/// The shape the blurred content is masked to.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BlurShape {
    /// A rectangle with independently rounded corners.
    Rectangle(CornerRadii),
    /// The largest circle centered in the view.
    Circle,
    /// The ellipse filling the view.
    Oval,
}

impl Default for BlurShape {
    fn default() -> Self {
        Self::Rectangle(CornerRadii::ZERO)
    }
}

/// A set of interaction states of a view, such as pressed or focused.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ViewState(u32);

impl ViewState {
    /// No particular state. An entry with this set matches any state.
    pub const NONE: Self = Self(0);
    /// The view is enabled.
    pub const ENABLED: Self = Self(1 << 0);
    /// The view has input focus.
    pub const FOCUSED: Self = Self(1 << 1);
    /// The view is pressed.
    pub const PRESSED: Self = Self(1 << 2);
    /// The view is selected.
    pub const SELECTED: Self = Self(1 << 3);
    /// The pointer hovers over the view.
    pub const HOVERED: Self = Self(1 << 4);

    /// Union of two state sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every state in `other` is also in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A color that depends on the [`ViewState`].
///
/// Entries are checked in order and the first whose state set is contained in the
/// current state wins; `default` is used when none matches.
#[derive(Debug, Clone)]
pub struct StateColors {
    entries: Vec<(ViewState, Color)>,
    default: Color,
}

impl StateColors {
    /// The same color in every state.
    pub fn single(color: Color) -> Self {
        Self {
            entries: Vec::new(),
            default: color,
        }
    }

    /// Add an entry used when the view is in (at least) `states`.
    #[must_use]
    pub fn with_state(mut self, states: ViewState, color: Color) -> Self {
        self.entries.push((states, color));
        self
    }

    /// The color for the given state.
    pub fn color_for_state(&self, state: ViewState) -> Color {
        self.entries
            .iter()
            .find(|(required, _)| state.contains(*required))
            .map_or(self.default, |(_, color)| *color)
    }

    /// The color used when no entry matches.
    pub fn default_color(&self) -> Color {
        self.default
    }
}

impl Default for StateColors {
    fn default() -> Self {
        Self::single(DEFAULT_BORDER_COLOR)
    }
}

impl From<Color> for StateColors {
    fn from(color: Color) -> Self {
        Self::single(color)
    }
}

/// Validated configuration of a blur view.
#[derive(Debug, Clone)]
pub struct BlurConfig {
    /// Blur radius in pixels of the view. `0` disables the blur.
    pub radius: f32,
    /// Ratio by which the view is shrunk before blurring, at least `1`.
    pub down_sample_factor: f32,
    /// Tint drawn over the blurred content.
    pub overlay_color: Color,
    /// Mask of the blurred content.
    pub shape: BlurShape,
    /// Width of the border stroke, `0` for no border.
    pub border_width: f32,
    /// Color of the border stroke.
    pub border_color: StateColors,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_BLUR_RADIUS,
            down_sample_factor: DEFAULT_DOWN_SAMPLE_FACTOR,
            overlay_color: Color::TRANSPARENT,
            shape: BlurShape::default(),
            border_width: 0.0,
            border_color: StateColors::default(),
        }
    }
}

impl BlurConfig {
    /// Check every value against its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_radius(self.radius)?;
        validate_down_sample_factor(self.down_sample_factor)?;
        if !self.border_width.is_finite() || self.border_width < 0.0 {
            return Err(ConfigError::InvalidBorderWidth(self.border_width));
        }
        if let BlurShape::Rectangle(radii) = &self.shape {
            radii.validate()?;
        }
        Ok(())
    }
}

pub(crate) fn validate_radius(radius: f32) -> Result<(), ConfigError> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(ConfigError::InvalidRadius(radius));
    }
    Ok(())
}

pub(crate) fn validate_down_sample_factor(factor: f32) -> Result<(), ConfigError> {
    if !factor.is_finite() || factor < 1.0 {
        return Err(ConfigError::InvalidDownSampleFactor(factor));
    }
    Ok(())
}

/// Attribute-style configuration, as produced by a styling system.
///
/// Every field is optional; [`resolve`](Self::resolve) fills in the defaults.
#[derive(Debug, Clone, Default)]
pub struct BlurAttributes {
    /// Blur radius in pixels.
    pub blur_radius: Option<f32>,
    /// Downsample factor.
    pub down_sample_factor: Option<f32>,
    /// Overlay color as packed `0xAARRGGBB`.
    pub overlay_color: Option<u32>,
    /// Radius used for every corner without its own override.
    pub corner_radius: Option<f32>,
    /// Top-left override, ignored unless positive.
    pub corner_radius_top_left: Option<f32>,
    /// Top-right override, ignored unless positive.
    pub corner_radius_top_right: Option<f32>,
    /// Bottom-right override, ignored unless positive.
    pub corner_radius_bottom_right: Option<f32>,
    /// Bottom-left override, ignored unless positive.
    pub corner_radius_bottom_left: Option<f32>,
    /// Shape of the mask.
    pub shape: Option<ShapeKind>,
    /// Border width in pixels.
    pub border_width: Option<f32>,
    /// Border colors.
    pub border_color: Option<StateColors>,
}

/// The shape selector of [`BlurAttributes`]; corner radii are given separately.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ShapeKind {
    /// See [`BlurShape::Rectangle`].
    #[default]
    Rectangle,
    /// See [`BlurShape::Circle`].
    Circle,
    /// See [`BlurShape::Oval`].
    Oval,
}

impl BlurAttributes {
    /// Resolve into a validated [`BlurConfig`].
    ///
    /// A per-corner radius overrides the shared `corner_radius` only when it is positive.
    /// An unset shared radius counts as zero. A negative border width counts as unset.
    pub fn resolve(&self) -> Result<BlurConfig, ConfigError> {
        let shared = self.corner_radius.unwrap_or(0.0).max(0.0);
        let corner = |value: Option<f32>| -> f64 {
            match value {
                Some(v) if v > 0.0 => f64::from(v),
                _ => f64::from(shared),
            }
        };
        let radii = CornerRadii::new(
            corner(self.corner_radius_top_left),
            corner(self.corner_radius_top_right),
            corner(self.corner_radius_bottom_right),
            corner(self.corner_radius_bottom_left),
        );
        let shape = match self.shape.unwrap_or_default() {
            ShapeKind::Rectangle => BlurShape::Rectangle(radii),
            ShapeKind::Circle => BlurShape::Circle,
            ShapeKind::Oval => BlurShape::Oval,
        };
        let border_width = self.border_width.filter(|w| *w >= 0.0).unwrap_or(0.0);

        let config = BlurConfig {
            radius: self.blur_radius.unwrap_or(DEFAULT_BLUR_RADIUS),
            down_sample_factor: self
                .down_sample_factor
                .unwrap_or(DEFAULT_DOWN_SAMPLE_FACTOR),
            overlay_color: color_from_argb(self.overlay_color.unwrap_or(0)),
            shape,
            border_width,
            border_color: self.border_color.clone().unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}
