use serde::{Deserialize, Serialize};

use crate::error::{GenFillError, Result};

/// Rectangular bounding box of the active selection, in document pixels.
///
/// The edges are stored as reported by the host; `width` and `height` are
/// derived, never negative and always fit in a `u32`. "No selection" is
/// modeled as `Option<SelectionBounds>::None`, never as a zero-size box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionBounds {
    top: i64,
    left: i64,
    bottom: i64,
    right: i64,
}

impl SelectionBounds {
    /// Returns `None` when the edges are inverted or span more than `u32::MAX` pixels.
    pub fn from_edges(top: i64, left: i64, bottom: i64, right: i64) -> Option<Self> {
        span(left, right)?;
        span(top, bottom)?;
        Some(Self {
            top,
            left,
            bottom,
            right,
        })
    }

    /// Returns `None` when the far edges overflow `i64`.
    pub fn from_rect(left: i64, top: i64, width: u32, height: u32) -> Option<Self> {
        Some(Self {
            top,
            left,
            bottom: top.checked_add(i64::from(height))?,
            right: left.checked_add(i64::from(width))?,
        })
    }

    pub fn top(&self) -> i64 {
        self.top
    }

    pub fn left(&self) -> i64 {
        self.left
    }

    pub fn bottom(&self) -> i64 {
        self.bottom
    }

    pub fn right(&self) -> i64 {
        self.right
    }

    pub fn width(&self) -> u32 {
        span(self.left, self.right).unwrap_or_default()
    }

    pub fn height(&self) -> u32 {
        span(self.top, self.bottom).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl std::fmt::Display for SelectionBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width(),
            self.height(),
            self.left,
            self.top
        )
    }
}

fn span(start: i64, end: i64) -> Option<u32> {
    end.checked_sub(start).and_then(|extent| u32::try_from(extent).ok())
}

/// Native bounding box of a layer on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerBounds {
    pub left: i64,
    pub top: i64,
    pub width: u32,
    pub height: u32,
}

impl LayerBounds {
    pub fn new(left: i64, top: i64, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Top-left position that centers a `width` x `height` box on the canvas.
    pub fn centered(canvas_width: u32, canvas_height: u32, width: u32, height: u32) -> Self {
        let left = (i64::from(canvas_width) - i64::from(width)) / 2;
        let top = (i64::from(canvas_height) - i64::from(height)) / 2;
        Self::new(left, top, width, height)
    }
}

/// Translation plus per-axis scale that moves a layer onto a selection.
///
/// Scaling is anchored at the layer's top-left corner and applied before
/// the offset, so `apply` lands the layer exactly on the target's origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementTransform {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale_x_percent: f64,
    pub scale_y_percent: f64,
}

impl PlacementTransform {
    pub fn fit(target: &SelectionBounds, layer: &LayerBounds) -> Result<Self> {
        if target.is_empty() {
            return Err(GenFillError::compositing(format!(
                "selection {} has no area to fit into",
                target
            )));
        }
        if layer.width == 0 || layer.height == 0 {
            return Err(GenFillError::compositing(
                "placed layer has zero size and cannot be scaled",
            ));
        }

        Ok(Self {
            offset_x: (target.left() - layer.left) as f64,
            offset_y: (target.top() - layer.top) as f64,
            scale_x_percent: f64::from(target.width()) / f64::from(layer.width) * 100.0,
            scale_y_percent: f64::from(target.height()) / f64::from(layer.height) * 100.0,
        })
    }

    /// Bounds of `layer` after this transform, rounded to whole pixels.
    pub fn apply(&self, layer: &LayerBounds) -> LayerBounds {
        let width = (f64::from(layer.width) * self.scale_x_percent / 100.0).round();
        let height = (f64::from(layer.height) * self.scale_y_percent / 100.0).round();
        LayerBounds {
            left: layer.left + self.offset_x.round() as i64,
            top: layer.top + self.offset_y.round() as i64,
            width: width.max(0.0) as u32,
            height: height.max(0.0) as u32,
        }
    }
}
