//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Output image format for removal results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel.
    #[default]
    Png,
    /// WebP with alpha channel.
    Webp,
    /// JPEG (background filled, no alpha).
    Jpeg,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// MIME type for the format.
    pub fn media_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Which removal model variant the capability should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalModel {
    /// General-purpose segmentation model.
    #[default]
    General,
    /// Model tuned for people and portraits.
    Portrait,
    /// Smaller, faster model with lower edge quality.
    Fast,
}

impl RemovalModel {
    /// Identifier passed to the external removal tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalModel::General => "general",
            RemovalModel::Portrait => "portrait",
            RemovalModel::Fast => "fast",
        }
    }
}

impl std::fmt::Display for RemovalModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_extensions() {
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Webp.media_type(), "image/webp");
    }

    #[test]
    fn enums_serialize_lowercase() {
        let json = serde_json::to_string(&OutputFormat::Webp).unwrap();
        assert_eq!(json, "\"webp\"");
        let model: RemovalModel = serde_json::from_str("\"portrait\"").unwrap();
        assert_eq!(model, RemovalModel::Portrait);
    }
}
