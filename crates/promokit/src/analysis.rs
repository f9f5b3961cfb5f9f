//! Typed product analysis record produced by the vision capability.
//!
//! Upstream responses are JSON-shaped and loosely specified; parsing happens
//! once at the capability boundary, and unrecognized enum values degrade to
//! `Unknown` instead of failing the whole record.

use serde::{Deserialize, Serialize};

/// Structured description of a product image: what it is, what it looks
/// like, and how confident the analyzer is. Feeds every downstream stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalysis {
    /// Product category, e.g. "beverage" or "cosmetics".
    pub category: String,
    /// Dominant and supporting colors.
    pub colors: ColorPalette,
    /// Physical shape of the product.
    pub shape: ShapeProfile,
    /// Surface finish.
    #[serde(default)]
    pub surface: SurfaceTexture,
    /// Analyzer confidence in [0, 1].
    pub confidence: f64,
}

impl ProductAnalysis {
    /// Clamps the confidence into [0, 1]; loose upstream payloads
    /// occasionally report percentages.
    pub fn normalized(mut self) -> Self {
        if self.confidence > 1.0 && self.confidence <= 100.0 {
            self.confidence /= 100.0;
        }
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPalette {
    /// Primary color as a hex string, e.g. "#FF0000".
    pub primary: String,
    /// Supporting colors.
    #[serde(default)]
    pub secondary: Vec<String>,
    /// Full extracted palette.
    #[serde(default)]
    pub palette: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeProfile {
    #[serde(default)]
    pub kind: ShapeKind,
    /// Relative dimensions, normalized so the largest axis is 1.0.
    #[serde(default)]
    pub dimensions: RelativeDimensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rectangular,
    Cylindrical,
    Spherical,
    Irregular,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeDimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Default for RelativeDimensions {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceTexture {
    Glossy,
    Matte,
    Metallic,
    Rough,
    Smooth,
    #[default]
    #[serde(other)]
    Unknown,
}
