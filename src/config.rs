//! Merge configuration.

use crate::fragments::TABLE_TOTAL_WIDTH;

/// Configuration for a merge run
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Image width in centimeters when an instruction gives none
    pub default_image_width_cm: f64,
    /// Image height in centimeters when an instruction gives none
    pub default_image_height_cm: f64,
    /// Total relative width shared by generated table columns
    pub table_total_width: u32,
    /// Directory under `word/` that receives image files
    pub media_dir: String,
    /// File name prefix for stored images
    pub media_prefix: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            default_image_width_cm: 3.0,
            default_image_height_cm: 3.0,
            table_total_width: TABLE_TOTAL_WIDTH,
            media_dir: "media".to_string(),
            media_prefix: "image".to_string(),
        }
    }
}

impl MergeConfig {
    /// Override the default image size
    pub fn with_default_image_size(mut self, width_cm: f64, height_cm: f64) -> Self {
        self.default_image_width_cm = width_cm;
        self.default_image_height_cm = height_cm;
        self
    }

    pub fn with_media_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.media_prefix = prefix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let default = MergeConfig::default();
        assert_eq!(default.default_image_width_cm, 3.0);
        assert_eq!(default.default_image_height_cm, 3.0);
        assert_eq!(default.table_total_width, 5000);
        assert_eq!(default.media_dir, "media");

        let sized = MergeConfig::default()
            .with_default_image_size(4.5, 2.0)
            .with_media_prefix("photo");
        assert_eq!(sized.default_image_width_cm, 4.5);
        assert_eq!(sized.default_image_height_cm, 2.0);
        assert_eq!(sized.media_prefix, "photo");
    }
}
