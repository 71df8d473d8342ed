use anyhow::{ensure, Result};
use serde::Deserialize;

/// Matching and sampling policy used by [`encode`](crate::processing::sample::encode).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Proposals overlapping a ground truth box by at least this much are foreground.
    pub fg_threshold: f32,
    /// Proposals whose best overlap is below this are background.
    pub bg_threshold: f32,
    /// Number of sampled rows per image.
    pub rois_per_image: usize,
    /// Upper bound on the foreground share of `rois_per_image`.
    #[serde(alias = "fg_roi_fraction")]
    pub fg_fraction: f32,
}

impl SampleConfig {
    pub fn new() -> Self {
        SampleConfig {
            fg_threshold: 0.5,
            bg_threshold: 0.3,
            rois_per_image: 256,
            fg_fraction: 0.25,
        }
    }

    /// Maximum number of foreground rows, rounded down.
    pub fn fg_rois_per_image(&self) -> usize {
        (self.rois_per_image as f32 * self.fg_fraction).floor() as usize
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.fg_threshold),
            "fg_threshold must be in [0, 1], but get {}",
            self.fg_threshold
        );
        ensure!(
            (0.0..=1.0).contains(&self.bg_threshold),
            "bg_threshold must be in [0, 1], but get {}",
            self.bg_threshold
        );
        ensure!(
            self.bg_threshold <= self.fg_threshold,
            "bg_threshold ({}) must not exceed fg_threshold ({})",
            self.bg_threshold,
            self.fg_threshold
        );
        ensure!(
            (0.0..=1.0).contains(&self.fg_fraction),
            "fg_fraction must be in [0, 1], but get {}",
            self.fg_fraction
        );
        Ok(())
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Proposal filtering used by [`sample_rpn_outputs`](crate::processing::roi::sample_rpn_outputs).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RpnConfig {
    pub min_size: f32,
    pub rpn_nms_threshold: f32,
    /// Zero disables the cut.
    pub pre_nms_top_n: usize,
    /// Zero disables the cut.
    pub post_nms_top_n: usize,
}

impl RpnConfig {
    pub fn new() -> Self {
        RpnConfig {
            min_size: 2.0,
            rpn_nms_threshold: 0.7,
            pre_nms_top_n: 12000,
            post_nms_top_n: 2000,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_size >= 0.0,
            "min_size must be non-negative, but get {}",
            self.min_size
        );
        ensure!(
            (0.0..=1.0).contains(&self.rpn_nms_threshold),
            "rpn_nms_threshold must be in [0, 1], but get {}",
            self.rpn_nms_threshold
        );
        Ok(())
    }
}

impl Default for RpnConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::rcnn::config::{RpnConfig, SampleConfig};

    #[test]
    fn test_sample_config_defaults() {
        let config = SampleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fg_rois_per_image(), 64);
    }

    #[test]
    fn test_sample_config_fg_rois_rounds_down() {
        let config = SampleConfig {
            rois_per_image: 10,
            fg_fraction: 0.25,
            ..SampleConfig::new()
        };
        assert_eq!(config.fg_rois_per_image(), 2);
    }

    #[test]
    fn test_sample_config_rejects_inverted_thresholds() {
        let config = SampleConfig {
            fg_threshold: 0.2,
            bg_threshold: 0.4,
            ..SampleConfig::new()
        };
        assert!(config.validate().is_err());

        let config = SampleConfig {
            fg_fraction: 1.5,
            ..SampleConfig::new()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_config_deserialize() {
        let config: SampleConfig =
            serde_json::from_str(r#"{ "fg_threshold": 0.7, "fg_roi_fraction": 0.5 }"#).unwrap();
        assert_eq!(config.fg_threshold, 0.7);
        assert_eq!(config.fg_fraction, 0.5);
        assert_eq!(config.bg_threshold, 0.3);
        assert_eq!(config.rois_per_image, 256);
    }

    #[test]
    fn test_rpn_config() {
        let config: RpnConfig = serde_json::from_str(r#"{ "post_nms_top_n": 300 }"#).unwrap();
        assert_eq!(config.post_nms_top_n, 300);
        assert_eq!(config.pre_nms_top_n, 12000);
        assert!(config.validate().is_ok());

        let config = RpnConfig {
            rpn_nms_threshold: -0.1,
            ..RpnConfig::new()
        };
        assert!(config.validate().is_err());
    }
}
