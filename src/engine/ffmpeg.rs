use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::format::OutputFormat;
use crate::error::{EngineError, MasteringError, Result};

/// Which step of a render an invocation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// First pass, output discarded, diagnostics carry the measurement
    Measure,
    /// Second pass with measured values fed back
    Apply,
    /// Single pass with targets only, used when measuring failed
    TargetOnly,
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::Measure => "measure",
            Pass::Apply => "apply",
            Pass::TargetOnly => "target-only",
        }
    }
}

/// Where the engine writes its audio
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    /// Discard the audio
    Null,
    File {
        path: PathBuf,
        format: OutputFormat,
        sample_rate: u32,
        channels: u16,
    },
}

/// One request to the external engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInvocation {
    pub pass: Pass,
    pub input: PathBuf,
    pub filter_graph: String,
    pub output: EngineOutput,
}

/// What the engine reported back
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRun {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Diagnostic text (stderr), kept verbatim
    pub diagnostics: String,
}

impl EngineRun {
    /// Convert a failed run into [`EngineError::Failed`]
    pub fn into_result(self, pass: Pass) -> Result<EngineRun> {
        if self.success {
            Ok(self)
        } else {
            Err(EngineError::Failed {
                pass: pass.name().to_string(),
                exit_code: self.exit_code,
                diagnostics: self.diagnostics,
            }
            .into())
        }
    }
}

/// How often a running engine process is checked for exit
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Extra time the runner waits for an engine to honor its own deadline
const DEADLINE_GRACE: Duration = Duration::from_secs(2);

/// Blocking interface to an audio-processing engine
///
/// Implementations must stop their work once `timeout` has elapsed and
/// report [`EngineError::TimedOut`].
pub trait AudioEngine: Send + Sync {
    fn run(&self, invocation: &EngineInvocation, timeout: Duration) -> Result<EngineRun>;
}

/// [`AudioEngine`] backed by the `ffmpeg` command-line tool
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    program: String,
}

impl FfmpegEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            program: config.program.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Command-line arguments for an invocation; paths are passed as separate
    /// arguments so no shell quoting is involved
    pub fn args(invocation: &EngineInvocation) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(invocation.input.clone().into_os_string());
        args.push("-af".into());
        args.push(invocation.filter_graph.clone().into());

        match &invocation.output {
            EngineOutput::Null => {
                args.extend(["-f", "null", "-"].iter().map(OsString::from));
            }
            EngineOutput::File { path, format, sample_rate, channels } => {
                args.push("-ar".into());
                args.push(sample_rate.to_string().into());
                args.push("-ac".into());
                args.push(channels.to_string().into());
                args.extend(format.codec_args().iter().map(OsString::from));
                args.push(path.clone().into_os_string());
            }
        }
        args
    }
}

impl AudioEngine for FfmpegEngine {
    fn run(&self, invocation: &EngineInvocation, timeout: Duration) -> Result<EngineRun> {
        let args = Self::args(invocation);
        debug!("Running {} {:?}", self.program, args);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::LaunchFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        wait_with_deadline(child, invocation.pass, timeout)
    }
}

/// Collect a child's exit status and stderr, killing it once `timeout` passes
fn wait_with_deadline(mut child: Child, pass: Pass, timeout: Duration) -> Result<EngineRun> {
    // stderr must be drained while waiting or a full pipe blocks the child
    let stderr = child.stderr.take();
    let reader = std::thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = stderr {
            let _ = pipe.read_to_end(&mut bytes);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            warn!("{} pass exceeded {:?}, killing engine process {}", pass.name(), timeout, child.id());
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::TimedOut {
                pass: pass.name().to_string(),
                seconds: timeout.as_secs(),
            }
            .into());
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let diagnostics = reader.join().map_err(|_| EngineError::Worker {
        reason: "diagnostics reader panicked".to_string(),
    })?;
    Ok(EngineRun {
        success: status.success(),
        exit_code: status.code(),
        diagnostics,
    })
}

/// Runs a blocking [`AudioEngine`] on tokio's blocking pool with a per-pass
/// timeout and a global limit on concurrent renders
///
/// The engine itself enforces the timeout and stops its process, so a timed
/// out pass has finished by the time its error is returned. An engine that
/// ignores its deadline is abandoned after a short grace period; its work may
/// then outlive the render slot.
#[derive(Clone)]
pub struct EngineRunner {
    engine: Arc<dyn AudioEngine>,
    pass_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl EngineRunner {
    pub fn new(engine: Arc<dyn AudioEngine>, config: &EngineConfig) -> Self {
        Self {
            engine,
            pass_timeout: Duration::from_secs(config.pass_timeout_secs),
            permits: Arc::new(Semaphore::new(config.max_concurrent_renders.max(1))),
        }
    }

    /// Reserve a render slot; hold it for every pass of one request
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| EngineError::Worker { reason: e.to_string() }.into())
    }

    /// Run one pass
    pub async fn run(&self, invocation: EngineInvocation) -> Result<EngineRun> {
        let pass = invocation.pass;
        let timeout = self.pass_timeout;
        let engine = Arc::clone(&self.engine);
        let handle = task::spawn_blocking(move || engine.run(&invocation, timeout));

        match tokio::time::timeout(timeout + DEADLINE_GRACE, handle).await {
            Ok(joined) => joined.map_err(|e| -> MasteringError {
                EngineError::Worker { reason: e.to_string() }.into()
            })?,
            Err(_) => {
                warn!("{} pass ignored its {:?} deadline; abandoning it", pass.name(), timeout);
                Err(EngineError::TimedOut {
                    pass: pass.name().to_string(),
                    seconds: self.pass_timeout.as_secs(),
                }
                .into())
            }
        }
    }
}
