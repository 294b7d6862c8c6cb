/*!
Construction parameters of a [`BlindSpotNet`](crate::network::BlindSpotNet).
 */

use crate::error::{Error, Result};

/// How the four rotated copies of the input go through the shared encoder/decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchMode {
    /// Stack the rotations on the batch axis and run one pass. Needs square images.
    Batched,
    /// Run each rotation on its own and join the results before fusion.
    PerBranch,
    /// `Batched` for square images, `PerBranch` otherwise.
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetConfig {
    /// Blind-spot size, 0 turns the blind-spot mechanism off.
    pub blindspot: usize,
    pub in_channels: i64,
    pub out_channels: i64,
    /// Base feature width of the encoder/decoder.
    pub features: i64,
    /// Negative slope of every leaky rectification.
    pub negative_slope: f64,
    pub branch_mode: BranchMode,
    /// Draws the initial weights from a private generator seeded with this value instead of
    /// libtorch's process-wide one.
    pub seed: Option<u64>,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            blindspot: 7,
            in_channels: 189,
            out_channels: 189,
            features: 64,
            negative_slope: 0.1,
            branch_mode: BranchMode::Auto,
            seed: None,
        }
    }
}

impl NetConfig {
    pub fn with_blindspot(mut self, blindspot: usize) -> Self {
        self.blindspot = blindspot;
        self
    }

    pub fn with_channels(mut self, in_channels: i64, out_channels: i64) -> Self {
        self.in_channels = in_channels;
        self.out_channels = out_channels;
        self
    }

    pub fn with_features(mut self, features: i64) -> Self {
        self.features = features;
        self
    }

    pub fn with_negative_slope(mut self, negative_slope: f64) -> Self {
        self.negative_slope = negative_slope;
        self
    }

    pub fn with_branch_mode(mut self, branch_mode: BranchMode) -> Self {
        self.branch_mode = branch_mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn is_blind(&self) -> bool {
        self.blindspot > 0
    }

    /// Vertical offset undoing the downward drift of the shifted stack.
    pub fn output_shift(&self) -> i64 {
        ((self.blindspot + 1) / 2) as i64
    }

    /// Channel width entering the fusion block: the four branches are concatenated in blind mode.
    pub fn fused_features(&self) -> i64 {
        if self.is_blind() {
            4 * self.features
        } else {
            self.features
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.in_channels < 1 || self.out_channels < 1 {
            return Err(Error::InvalidConfig(format!(
                "channel counts must be positive, got {} in and {} out",
                self.in_channels, self.out_channels
            )));
        }
        if self.features < 2 {
            return Err(Error::InvalidConfig(format!(
                "at least 2 features are needed, got {}",
                self.features
            )));
        }
        if !(0.0..1.0).contains(&self.negative_slope) {
            return Err(Error::InvalidConfig(format!(
                "negative slope must be in [0, 1), got {}",
                self.negative_slope
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_matches_reference_model() {
        let config = NetConfig::default();
        assert_eq!(config.blindspot, 7);
        assert_eq!((config.in_channels, config.out_channels, config.features), (189, 189, 64));
        assert_eq!(config.output_shift(), 4);
        assert_eq!(config.fused_features(), 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_shift() {
        let shifts: Vec<_> = (0..6)
            .map(|b| NetConfig::default().with_blindspot(b).output_shift())
            .collect();
        assert_eq!(shifts, [0, 1, 1, 2, 2, 3]);
    }

    #[test]
    fn test_plain_mode() {
        let config = NetConfig::default().with_blindspot(0).with_features(16);
        assert!(!config.is_blind());
        assert_eq!(config.fused_features(), 16);
    }

    #[test]
    fn test_validate() {
        assert!(NetConfig::default().with_channels(0, 3).validate().is_err());
        assert!(NetConfig::default().with_features(1).validate().is_err());
        assert!(NetConfig::default().with_negative_slope(-0.1).validate().is_err());
        assert!(NetConfig::default().with_negative_slope(1.0).validate().is_err());
        assert!(NetConfig::default().with_negative_slope(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_zero_slope_is_plain_relu() {
        let config = NetConfig::default().with_negative_slope(0.0);
        assert!(config.validate().is_ok());
    }
}
