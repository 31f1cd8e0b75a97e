use tracing::debug;

use crate::chain::stage::{FilterChainSpec, ParamValue, Stage, StageKind};
use crate::config::ChainConfig;
use crate::mastering::params::MasteringParameters;

/// Compiles [`MasteringParameters`] into the fixed-order filter chain:
/// high-pass (optional), low shelf, high shelf, compressor, stereo widen
/// (optional), loudness normalizer.
#[derive(Debug, Clone, Default)]
pub struct ChainBuilder {
    config: ChainConfig,
}

impl ChainBuilder {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, params: &MasteringParameters) -> FilterChainSpec {
        let c = &self.config;
        let tone = &params.tone;
        let mut stages = Vec::with_capacity(6);

        if tone.high_pass {
            stages.push(
                Stage::new(StageKind::HighPass)
                    .with("f", c.highpass_freq)
                    .with("width", c.highpass_width),
            );
        }

        stages.push(
            Stage::new(StageKind::LowShelf)
                .with("g", tone.low_shelf_gain_db)
                .with("f", tone.low_shelf_freq)
                .with("w", tone.low_shelf_width)
                .bypass(tone.low_shelf_gain_db.abs() < c.shelf_bypass_db),
        );
        stages.push(
            Stage::new(StageKind::HighShelf)
                .with("g", tone.high_shelf_gain_db)
                .with("f", tone.high_shelf_freq)
                .with("w", tone.high_shelf_width)
                .bypass(tone.high_shelf_gain_db.abs() < c.shelf_bypass_db),
        );

        let comp = &params.compressor;
        stages.push(
            Stage::new(StageKind::Compressor)
                .with("ratio", comp.ratio)
                .with("threshold", ParamValue::Decibels(comp.threshold_db))
                .with("attack", comp.attack_ms)
                .with("release", comp.release_ms),
        );

        if params.stereo_widen {
            stages.push(
                Stage::new(StageKind::StereoWiden)
                    .with("delay", c.widen_delay_ms)
                    .with("drymix", c.widen_drymix)
                    .with("crossfeed", c.widen_crossfeed)
                    .with("feedback", c.widen_feedback),
            );
        }

        let target = &params.loudness;
        stages.push(
            Stage::new(StageKind::LoudnessNormalizer)
                .with("I", target.integrated_lufs)
                .with("TP", target.true_peak_db)
                .with("LRA", target.loudness_range_lu),
        );

        let chain = FilterChainSpec::new(stages);
        debug!("Built filter chain: {}", chain);
        chain
    }
}
