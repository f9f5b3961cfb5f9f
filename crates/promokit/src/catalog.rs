//! Static catalogs: ad platform dimensions, package variation styles, and
//! package template selection.

use serde::{Deserialize, Serialize};

use crate::analysis::ShapeKind;

/// Size classes supported by the image synthesis capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSize {
    Square,
    Landscape,
    Portrait,
}

impl ImageSize {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ImageSize::Square => (1024, 1024),
            ImageSize::Landscape => (1792, 1024),
            ImageSize::Portrait => (1024, 1792),
        }
    }

    /// Wire value expected by the synthesis provider.
    pub fn api_value(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }
}

/// Advertising platform with a canonical output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdPlatform {
    InstagramSquare,
    TwitterCard,
    FacebookFeed,
    WebBannerMediumRectangle,
}

impl AdPlatform {
    /// The default platform set used when a submission does not name any.
    pub fn defaults() -> Vec<AdPlatform> {
        vec![
            AdPlatform::InstagramSquare,
            AdPlatform::TwitterCard,
            AdPlatform::FacebookFeed,
            AdPlatform::WebBannerMediumRectangle,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            AdPlatform::InstagramSquare => "instagram-square",
            AdPlatform::TwitterCard => "twitter-card",
            AdPlatform::FacebookFeed => "facebook-feed",
            AdPlatform::WebBannerMediumRectangle => "web-banner-medium-rectangle",
        }
    }

    /// Canonical output dimensions in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AdPlatform::InstagramSquare => (1080, 1080),
            AdPlatform::TwitterCard => (1200, 675),
            AdPlatform::FacebookFeed => (1200, 628),
            AdPlatform::WebBannerMediumRectangle => (300, 250),
        }
    }

    /// The closest size class the synthesizer supports; the generated image
    /// is then resized down to [`Self::dimensions`].
    pub fn synthesis_size(&self) -> ImageSize {
        let (w, h) = self.dimensions();
        if w == h {
            ImageSize::Square
        } else if w > h {
            ImageSize::Landscape
        } else {
            ImageSize::Portrait
        }
    }
}

impl std::fmt::Display for AdPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Stylistic direction for one package-design variation.
///
/// The catalog is ordered; variation slots are assigned front-to-back so a
/// request never receives duplicate styles (the maximum variation count
/// equals the catalog length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationStyle {
    Minimalist,
    Vibrant,
    Premium,
    Playful,
    Organic,
    Bold,
    Elegant,
    Retro,
    Modern,
    Luxury,
}

impl VariationStyle {
    pub const ORDERED: [VariationStyle; 10] = [
        VariationStyle::Minimalist,
        VariationStyle::Vibrant,
        VariationStyle::Premium,
        VariationStyle::Playful,
        VariationStyle::Organic,
        VariationStyle::Bold,
        VariationStyle::Elegant,
        VariationStyle::Retro,
        VariationStyle::Modern,
        VariationStyle::Luxury,
    ];

    /// The first `count` styles in catalog order, duplicate-free.
    pub fn pick(count: usize) -> Vec<VariationStyle> {
        Self::ORDERED.iter().copied().take(count).collect()
    }

    pub fn slug(&self) -> &'static str {
        match self {
            VariationStyle::Minimalist => "minimalist",
            VariationStyle::Vibrant => "vibrant",
            VariationStyle::Premium => "premium",
            VariationStyle::Playful => "playful",
            VariationStyle::Organic => "organic",
            VariationStyle::Bold => "bold",
            VariationStyle::Elegant => "elegant",
            VariationStyle::Retro => "retro",
            VariationStyle::Modern => "modern",
            VariationStyle::Luxury => "luxury",
        }
    }

    /// Style descriptor woven into the synthesis prompt.
    pub fn prompt_hint(&self) -> &'static str {
        match self {
            VariationStyle::Minimalist => "clean minimalist design, generous whitespace, restrained typography",
            VariationStyle::Vibrant => "vivid saturated colors, energetic composition, bold contrast",
            VariationStyle::Premium => "premium refined look, subtle metallic accents, understated elegance",
            VariationStyle::Playful => "playful illustrated style, rounded shapes, friendly tone",
            VariationStyle::Organic => "natural organic aesthetic, earthy tones, textured paper feel",
            VariationStyle::Bold => "bold graphic design, oversized lettering, high-impact layout",
            VariationStyle::Elegant => "elegant classic styling, serif typography, balanced symmetry",
            VariationStyle::Retro => "retro vintage look, aged palette, nostalgic badges",
            VariationStyle::Modern => "contemporary geometric design, flat colors, grid layout",
            VariationStyle::Luxury => "luxury presentation, deep dark palette, gold foil details",
        }
    }
}

impl std::fmt::Display for VariationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Picks a package template from the analysis category and shape when the
/// submission did not name one.
pub fn select_template(category: &str, shape: ShapeKind) -> &'static str {
    let category = category.to_lowercase();

    if category.contains("beverage") || category.contains("drink") {
        return match shape {
            ShapeKind::Cylindrical => "bottle-label",
            _ => "carton",
        };
    }
    if category.contains("cosmetic") || category.contains("beauty") {
        return match shape {
            ShapeKind::Cylindrical => "tube",
            ShapeKind::Spherical => "jar",
            _ => "box",
        };
    }
    if category.contains("food") || category.contains("snack") {
        return match shape {
            ShapeKind::Rectangular => "box",
            _ => "pouch",
        };
    }

    // Fallback purely on shape.
    match shape {
        ShapeKind::Rectangular => "box",
        ShapeKind::Cylindrical => "can-wrap",
        ShapeKind::Spherical => "jar",
        ShapeKind::Irregular | ShapeKind::Unknown => "pouch",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_platforms_in_order() {
        let defaults = AdPlatform::defaults();
        assert_eq!(defaults.len(), 4);
        assert_eq!(defaults[0], AdPlatform::InstagramSquare);
        assert_eq!(defaults[3], AdPlatform::WebBannerMediumRectangle);
    }

    #[test]
    fn test_platform_serde_kebab_case() {
        let json = serde_json::to_string(&AdPlatform::WebBannerMediumRectangle).unwrap();
        assert_eq!(json, "\"web-banner-medium-rectangle\"");
        let parsed: AdPlatform = serde_json::from_str("\"instagram-square\"").unwrap();
        assert_eq!(parsed, AdPlatform::InstagramSquare);
    }

    #[test]
    fn test_synthesis_size_mapping() {
        assert_eq!(AdPlatform::InstagramSquare.synthesis_size(), ImageSize::Square);
        assert_eq!(AdPlatform::TwitterCard.synthesis_size(), ImageSize::Landscape);
        assert_eq!(AdPlatform::FacebookFeed.synthesis_size(), ImageSize::Landscape);
        assert_eq!(
            AdPlatform::WebBannerMediumRectangle.synthesis_size(),
            ImageSize::Landscape
        );
    }

    #[test]
    fn test_style_pick_is_duplicate_free() {
        let ten = VariationStyle::pick(10);
        assert_eq!(ten.len(), 10);
        let mut deduped = ten.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 10);

        let three = VariationStyle::pick(3);
        assert_eq!(
            three,
            vec![
                VariationStyle::Minimalist,
                VariationStyle::Vibrant,
                VariationStyle::Premium
            ]
        );
    }

    #[test]
    fn test_template_selection() {
        assert_eq!(select_template("beverage", ShapeKind::Cylindrical), "bottle-label");
        assert_eq!(select_template("Beverage", ShapeKind::Rectangular), "carton");
        assert_eq!(select_template("cosmetics", ShapeKind::Cylindrical), "tube");
        assert_eq!(select_template("snack food", ShapeKind::Irregular), "pouch");
        assert_eq!(select_template("electronics", ShapeKind::Rectangular), "box");
        assert_eq!(select_template("mystery", ShapeKind::Unknown), "pouch");
    }

    #[test]
    fn test_image_size_api_values() {
        assert_eq!(ImageSize::Square.api_value(), "1024x1024");
        assert_eq!(ImageSize::Landscape.api_value(), "1792x1024");
        assert_eq!(ImageSize::Portrait.api_value(), "1024x1792");
    }
}
