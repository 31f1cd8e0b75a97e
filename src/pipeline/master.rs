use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task;
use tracing::{debug, info, warn};

use crate::{
    audio::{AnalysisReport, AudioAnalyzer, AudioLoader},
    chain::{ChainBuilder, FilterChainSpec},
    config::Config,
    engine::{
        AudioEngine, EngineRunner, FfmpegEngine, NormalizationOutcome, NormalizationReport,
        OutputFormat, TwoPassNormalizer,
    },
    error::{MasteringError, Result},
    mastering::{suggest_presets, DecisionEngine, MasteringParameters, PresetRegistry, PresetSelection},
    pipeline::compare::{compare_files, ComparisonReport},
};

/// Where the mastering parameters come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasteringMode {
    /// Derived from the analysis by the decision engine
    Auto,
    /// Taken from named presets
    Preset(PresetSelection),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasterOptions {
    pub mode: MasteringMode,
    pub format: OutputFormat,
    /// Re-render in smaller formats until the file fits
    pub max_bytes: Option<u64>,
}

/// Analysis, decisions and the chain they compile to, before any rendering
#[derive(Debug, Clone)]
pub struct MasteringPlan {
    pub report: AnalysisReport,
    pub parameters: MasteringParameters,
    pub chain: FilterChainSpec,
    /// Closest named presets, for the human-readable summary
    pub suggested: PresetSelection,
}

/// A finished render and its size
#[derive(Debug, Clone)]
pub struct SizedRender {
    pub normalization: NormalizationReport,
    pub bytes: u64,
    /// False when even the smallest format exceeded the limit
    pub within_limit: bool,
}

#[derive(Debug, Clone)]
pub struct MasteringOutcome {
    pub plan: MasteringPlan,
    pub render: SizedRender,
}

impl MasteringOutcome {
    pub fn output(&self) -> &Path {
        &self.render.normalization.output
    }

    /// Caption describing what was measured and what was done
    pub fn summary(&self) -> String {
        let normalization = match &self.render.normalization.outcome {
            NormalizationOutcome::TwoPass(m) => {
                format!("two-pass (measured I {:.1} LUFS, TP {:.1} dBTP)", m.input_i, m.input_tp)
            }
            NormalizationOutcome::Degraded(reason) => format!("single pass ({})", reason),
        };
        format!(
            "Analysis: {}\n{}\nClosest presets: {}\nNormalization: {}\nOutput: {} ({:.1} MB)",
            self.plan.report.summary_line(),
            self.plan.parameters.summary(),
            self.plan.suggested,
            normalization,
            self.render.normalization.format,
            self.render.bytes as f64 / 1_048_576.0,
        )
    }
}

/// Orchestrates analysis, decision, chain building and the two-pass render
///
/// The pipeline follows these steps:
/// 1. Load - decode, resample and trim the recording
/// 2. Analyze - run every meter and build the report
/// 3. Decide - map the report (or the chosen presets) to parameters
/// 4. Build - compile the parameters into a filter chain
/// 5. Render - two-pass loudness normalization through the engine, falling
///    back to smaller formats when a size limit is given
pub struct MasteringPipeline {
    config: Config,
    analyzer: AudioAnalyzer,
    decision: DecisionEngine,
    presets: PresetRegistry,
    builder: ChainBuilder,
    normalizer: TwoPassNormalizer,
}

impl MasteringPipeline {
    /// Pipeline rendering through the configured `ffmpeg` executable
    pub fn new(config: Config) -> Self {
        let engine = Arc::new(FfmpegEngine::new(&config.engine));
        Self::with_engine(config, engine)
    }

    pub fn with_engine(config: Config, engine: Arc<dyn AudioEngine>) -> Self {
        let runner = EngineRunner::new(engine, &config.engine);
        Self {
            analyzer: AudioAnalyzer::with_config(&config),
            decision: DecisionEngine::new(config.decision.clone()),
            presets: PresetRegistry::new(config.presets.clone(), &config.decision),
            builder: ChainBuilder::new(config.chain.clone()),
            normalizer: TwoPassNormalizer::new(runner, &config.engine),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn presets(&self) -> &PresetRegistry {
        &self.presets
    }

    /// Master `input` into `output`; the extension of `output` follows the format
    pub async fn master<P: AsRef<Path>>(
        &self,
        input: P,
        output: P,
        options: &MasterOptions,
    ) -> Result<MasteringOutcome> {
        let input = input.as_ref();
        let output = output.as_ref();

        info!("🎚️ Starting mastering");
        info!("   Input: {:?}", input);
        info!("   Output: {:?}", output);
        info!("   Format: {}", options.format);

        // Pipeline Steps 1-4: analysis, decision and chain
        let plan = self.plan(input, options.mode).await?;

        // Pipeline Step 5: render
        let render = self
            .render_within(input, &plan.chain, output, options.format, options.max_bytes)
            .await?;

        info!("🎉 Mastering complete! Output saved to: {:?}", render.normalization.output);
        Ok(MasteringOutcome { plan, render })
    }

    // ==========================================
    // PIPELINE STEPS 1-2: LOAD & ANALYZE
    // ==========================================

    /// Decode and measure a file without rendering anything
    pub async fn analyze<P: AsRef<Path>>(&self, input: P) -> Result<AnalysisReport> {
        let input = input.as_ref();
        info!("🎵 Step 1: Loading audio...");
        let buffer = AudioLoader::load(input, &self.config.analysis).await.map_err(|e| {
            warn!("Failed to load audio file: {}", e);
            e
        })?;

        info!("📊 Step 2: Analyzing audio...");
        let analyzer = self.analyzer.clone();
        task::spawn_blocking(move || analyzer.analyze(&buffer))
            .await
            .map_err(|e| MasteringError::generic(format!("analysis task failed: {}", e)))?
    }

    // ==========================================
    // PIPELINE STEPS 3-4: DECIDE & BUILD
    // ==========================================

    /// Parameters for a report under the given mode
    pub fn parameters(&self, report: &AnalysisReport, mode: MasteringMode) -> MasteringParameters {
        match mode {
            MasteringMode::Auto => self.decision.decide(report),
            MasteringMode::Preset(selection) => self.presets.parameters(selection),
        }
    }

    /// Analyze, decide and build the chain
    pub async fn plan<P: AsRef<Path>>(&self, input: P, mode: MasteringMode) -> Result<MasteringPlan> {
        let report = self.analyze(input).await?;

        info!("🧠 Step 3: Deciding mastering parameters...");
        let parameters = self.parameters(&report, mode);
        let suggested = suggest_presets(&report);
        match mode {
            MasteringMode::Auto => info!("   Auto mode, closest presets: {}", suggested),
            MasteringMode::Preset(selection) => info!("   Presets: {}", selection),
        }
        for line in parameters.summary().lines() {
            info!("   {}", line);
        }

        info!("⛓️ Step 4: Building filter chain...");
        let chain = self.builder.build(&parameters);
        // Reject unrenderable chains before the engine runs
        let graph = chain.render()?;
        debug!("   Filter graph: {}", graph);

        Ok(MasteringPlan {
            report,
            parameters,
            chain,
            suggested,
        })
    }

    // ==========================================
    // PIPELINE STEP 5: RENDER
    // ==========================================

    /// Render `chain` at `format`, stepping down through smaller formats while
    /// the result exceeds `max_bytes`. The chain is never rebuilt.
    pub async fn render_within(
        &self,
        input: &Path,
        chain: &FilterChainSpec,
        output: &Path,
        format: OutputFormat,
        max_bytes: Option<u64>,
    ) -> Result<SizedRender> {
        let mut format = format;
        loop {
            let path = output_path(output, format);
            info!("🔊 Step 5: Rendering {} to {:?}...", format, path);

            let normalization = self.normalizer.normalize(input, chain, &path, format).await?;
            let bytes = tokio::fs::metadata(&path).await?.len();

            let limit = match max_bytes {
                Some(limit) if bytes > limit => limit,
                _ => {
                    return Ok(SizedRender {
                        normalization,
                        bytes,
                        within_limit: true,
                    })
                }
            };

            match format.smaller() {
                Some(next) => {
                    warn!(
                        "   {} output is {} bytes (limit {}), retrying as {}",
                        format, bytes, limit, next
                    );
                    tokio::fs::remove_file(&path).await?;
                    format = next;
                }
                None => {
                    warn!("   {} output is {} bytes, still above the {} byte limit", format, bytes, limit);
                    return Ok(SizedRender {
                        normalization,
                        bytes,
                        within_limit: false,
                    });
                }
            }
        }
    }

    /// Before/after comparison on the blocking pool
    pub async fn compare<P: AsRef<Path>>(&self, before: P, after: P) -> Result<ComparisonReport> {
        let before = before.as_ref().to_path_buf();
        let after = after.as_ref().to_path_buf();
        let config = self.config.clone();
        task::spawn_blocking(move || compare_files(&before, &after, &config))
            .await
            .map_err(|e| MasteringError::generic(format!("comparison task failed: {}", e)))?
    }
}

/// `output` with the extension the format encodes to
fn output_path(output: &Path, format: OutputFormat) -> PathBuf {
    output.with_extension(format.extension())
}
