use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chain::FilterChainSpec;
use crate::config::EngineConfig;
use crate::engine::ffmpeg::{EngineInvocation, EngineOutput, EngineRunner, Pass};
use crate::engine::format::OutputFormat;
use crate::engine::measurement::{parse_measurement, LoudnessMeasurement, MeasurementError};
use crate::error::Result;

/// Steps of one two-pass render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizerState {
    Idle,
    MeasurePass,
    ParseMeasurement,
    ApplyPass,
    Degraded,
    Done,
}

impl fmt::Display for NormalizerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NormalizerState::Idle => "idle",
            NormalizerState::MeasurePass => "measure-pass",
            NormalizerState::ParseMeasurement => "parse-measurement",
            NormalizerState::ApplyPass => "apply-pass",
            NormalizerState::Degraded => "degraded",
            NormalizerState::Done => "done",
        };
        f.write_str(name)
    }
}

/// How the output loudness was reached
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationOutcome {
    /// Linear normalization using the first-pass measurement
    TwoPass(LoudnessMeasurement),
    /// The measurement was unusable; rendered with targets only
    Degraded(MeasurementError),
}

impl NormalizationOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, NormalizationOutcome::Degraded(_))
    }
}

#[derive(Debug, Clone)]
pub struct NormalizationReport {
    pub outcome: NormalizationOutcome,
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Every state visited, starting at `Idle`
    pub transitions: Vec<NormalizerState>,
}

/// Measure-then-apply loudness normalization through the external engine
///
/// A measurement that cannot be parsed degrades to a single target-only
/// render and never fails the request. A non-zero exit from any pass is
/// fatal and carries the engine's diagnostics verbatim.
#[derive(Clone)]
pub struct TwoPassNormalizer {
    runner: EngineRunner,
    sample_rate: u32,
    channels: u16,
}

impl TwoPassNormalizer {
    pub fn new(runner: EngineRunner, config: &EngineConfig) -> Self {
        Self {
            runner,
            sample_rate: config.output_sample_rate,
            channels: config.output_channels,
        }
    }

    pub async fn normalize(
        &self,
        input: &Path,
        chain: &FilterChainSpec,
        output: &Path,
        format: OutputFormat,
    ) -> Result<NormalizationReport> {
        // Both passes run under one render slot
        let _permit = self.runner.acquire().await?;
        let mut transitions = vec![NormalizerState::Idle];

        // MEASURE
        advance(&mut transitions, NormalizerState::MeasurePass);
        let measure_chain = chain.with_normalizer(|stage| stage.set("print_format", "json"))?;
        let measured = self
            .runner
            .run(EngineInvocation {
                pass: Pass::Measure,
                input: input.to_path_buf(),
                filter_graph: measure_chain.render()?,
                output: EngineOutput::Null,
            })
            .await?
            .into_result(Pass::Measure)?;

        // PARSE
        advance(&mut transitions, NormalizerState::ParseMeasurement);
        let (pass, graph, outcome) = match parse_measurement(&measured.diagnostics) {
            Ok(m) => {
                debug!(
                    "Measured I={} TP={} LRA={} thresh={} offset={}",
                    m.input_i, m.input_tp, m.input_lra, m.input_thresh, m.target_offset
                );
                advance(&mut transitions, NormalizerState::ApplyPass);
                let apply_chain = chain.with_normalizer(|stage| {
                    stage.set("measured_I", m.input_i);
                    stage.set("measured_LRA", m.input_lra);
                    stage.set("measured_TP", m.input_tp);
                    stage.set("measured_thresh", m.input_thresh);
                    stage.set("offset", m.target_offset);
                    stage.set("linear", true);
                })?;
                (Pass::Apply, apply_chain.render()?, NormalizationOutcome::TwoPass(m))
            }
            Err(e) => {
                warn!("Loudness measurement unusable ({}), rendering with targets only", e);
                advance(&mut transitions, NormalizerState::Degraded);
                (Pass::TargetOnly, chain.render()?, NormalizationOutcome::Degraded(e))
            }
        };

        // RENDER
        self.runner
            .run(EngineInvocation {
                pass,
                input: input.to_path_buf(),
                filter_graph: graph,
                output: EngineOutput::File {
                    path: output.to_path_buf(),
                    format,
                    sample_rate: self.sample_rate,
                    channels: self.channels,
                },
            })
            .await?
            .into_result(pass)?;

        advance(&mut transitions, NormalizerState::Done);
        Ok(NormalizationReport {
            outcome,
            output: output.to_path_buf(),
            format,
            transitions,
        })
    }
}

fn advance(transitions: &mut Vec<NormalizerState>, next: NormalizerState) {
    if let Some(current) = transitions.last() {
        info!("Normalizer: {} -> {}", current, next);
    }
    transitions.push(next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Stage, StageKind};
    use crate::engine::ffmpeg::{AudioEngine, EngineRun};
    use crate::error::{EngineError, MasteringError};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;

    const MEASUREMENT: &str = r#"[Parsed_loudnorm_1 @ 0x1]
{
	"input_i" : "-20.00",
	"input_tp" : "-4.50",
	"input_lra" : "7.10",
	"input_thresh" : "-30.20",
	"target_offset" : "0.30"
}"#;

    /// Deterministic engine: answers each pass from a script and writes the
    /// filter graph it received as the "rendered" file
    struct ScriptedEngine {
        measure: EngineRun,
        render: EngineRun,
        calls: Mutex<Vec<EngineInvocation>>,
    }

    impl ScriptedEngine {
        fn new(measure: EngineRun, render: EngineRun) -> Arc<Self> {
            Arc::new(Self { measure, render, calls: Mutex::new(Vec::new()) })
        }

        fn calls(&self) -> Vec<EngineInvocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AudioEngine for ScriptedEngine {
        fn run(&self, invocation: &EngineInvocation, _timeout: Duration) -> Result<EngineRun> {
            self.calls.lock().unwrap().push(invocation.clone());
            match &invocation.output {
                EngineOutput::Null => Ok(self.measure.clone()),
                EngineOutput::File { path, .. } => {
                    if self.render.success {
                        std::fs::write(path, invocation.filter_graph.as_bytes())?;
                    }
                    Ok(self.render.clone())
                }
            }
        }
    }

    fn ok(diagnostics: &str) -> EngineRun {
        EngineRun { success: true, exit_code: Some(0), diagnostics: diagnostics.to_string() }
    }

    fn failed(diagnostics: &str) -> EngineRun {
        EngineRun { success: false, exit_code: Some(1), diagnostics: diagnostics.to_string() }
    }

    fn chain() -> FilterChainSpec {
        FilterChainSpec::new(vec![
            Stage::new(StageKind::Compressor).with("ratio", 2.0),
            Stage::new(StageKind::LoudnessNormalizer)
                .with("I", -14.0)
                .with("TP", -1.0)
                .with("LRA", 7.0),
        ])
    }

    fn normalizer(engine: Arc<ScriptedEngine>) -> TwoPassNormalizer {
        let config = EngineConfig::default();
        TwoPassNormalizer::new(EngineRunner::new(engine, &config), &config)
    }

    #[tokio::test]
    async fn test_two_pass_happy_path() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let engine = ScriptedEngine::new(ok(MEASUREMENT), ok(""));

        let report = normalizer(engine.clone())
            .normalize(Path::new("in.wav"), &chain(), &out, OutputFormat::Wav16)
            .await
            .unwrap();

        assert_eq!(
            report.transitions,
            vec![
                NormalizerState::Idle,
                NormalizerState::MeasurePass,
                NormalizerState::ParseMeasurement,
                NormalizerState::ApplyPass,
                NormalizerState::Done
            ]
        );
        assert!(matches!(report.outcome, NormalizationOutcome::TwoPass(m) if m.input_i == -20.0));

        let calls = engine.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].pass, Pass::Measure);
        assert_eq!(
            calls[0].filter_graph,
            "acompressor=ratio=2,loudnorm=I=-14:TP=-1:LRA=7:print_format=json"
        );
        assert_eq!(calls[1].pass, Pass::Apply);
        assert_eq!(
            calls[1].filter_graph,
            "acompressor=ratio=2,loudnorm=I=-14:TP=-1:LRA=7:measured_I=-20:measured_LRA=7.1:\
             measured_TP=-4.5:measured_thresh=-30.2:offset=0.3:linear=true"
        );
        assert!(out.exists());
    }

    #[tokio::test]
    async fn test_unparseable_measurement_degrades() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let engine = ScriptedEngine::new(ok("size=N/A { broken"), ok(""));

        let report = normalizer(engine.clone())
            .normalize(Path::new("in.wav"), &chain(), &out, OutputFormat::Wav24)
            .await
            .unwrap();

        assert!(report.outcome.is_degraded());
        assert_eq!(
            report.transitions,
            vec![
                NormalizerState::Idle,
                NormalizerState::MeasurePass,
                NormalizerState::ParseMeasurement,
                NormalizerState::Degraded,
                NormalizerState::Done
            ]
        );
        let calls = engine.calls();
        assert_eq!(calls[1].pass, Pass::TargetOnly);
        assert_eq!(calls[1].filter_graph, "acompressor=ratio=2,loudnorm=I=-14:TP=-1:LRA=7");
    }

    #[tokio::test]
    async fn test_fieldless_final_block_degrades() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let diagnostics = format!("{}\n[out#0] {{\"b\":2}}", MEASUREMENT);
        let engine = ScriptedEngine::new(ok(&diagnostics), ok(""));

        let report = normalizer(engine.clone())
            .normalize(Path::new("in.wav"), &chain(), &out, OutputFormat::Wav16)
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            NormalizationOutcome::Degraded(MeasurementError::MissingField("input_i"))
        );
        assert_eq!(engine.calls()[1].pass, Pass::TargetOnly);
    }

    #[tokio::test]
    async fn test_degraded_render_is_repeatable() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.wav");
        let second = dir.path().join("b.wav");
        let engine = ScriptedEngine::new(ok("no measurement"), ok(""));
        let normalizer = normalizer(engine);

        normalizer
            .normalize(Path::new("in.wav"), &chain(), &first, OutputFormat::Wav16)
            .await
            .unwrap();
        normalizer
            .normalize(Path::new("in.wav"), &chain(), &second, OutputFormat::Wav16)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }

    #[tokio::test]
    async fn test_measure_failure_surfaces_diagnostics() {
        let dir = tempdir().unwrap();
        let engine = ScriptedEngine::new(failed("in.wav: Invalid data found when processing input"), ok(""));

        let result = normalizer(engine.clone())
            .normalize(Path::new("in.wav"), &chain(), &dir.path().join("out.wav"), OutputFormat::Wav16)
            .await;

        match result {
            Err(MasteringError::Engine(EngineError::Failed { pass, diagnostics, .. })) => {
                assert_eq!(pass, "measure");
                assert_eq!(diagnostics, "in.wav: Invalid data found when processing input");
            }
            other => panic!("expected measure failure, got {:?}", other),
        }
        assert_eq!(engine.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.mp3");
        let engine = ScriptedEngine::new(ok(MEASUREMENT), failed("Unknown encoder 'libmp3lame'"));

        let result = normalizer(engine)
            .normalize(Path::new("in.wav"), &chain(), &out, OutputFormat::Mp3_320)
            .await;

        assert!(matches!(
            result,
            Err(MasteringError::Engine(EngineError::Failed { ref pass, .. })) if pass == "apply"
        ));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_chain_without_normalizer_is_rejected() {
        let engine = ScriptedEngine::new(ok(MEASUREMENT), ok(""));
        let chain = FilterChainSpec::new(vec![Stage::new(StageKind::Compressor)]);

        let result = normalizer(engine.clone())
            .normalize(Path::new("in.wav"), &chain, Path::new("out.wav"), OutputFormat::Wav16)
            .await;

        assert!(result.is_err());
        assert!(engine.calls().is_empty());
    }
}
