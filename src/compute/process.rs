//! Simulator backed by an external transport code.
//!
//! Every run gets a fresh scratch directory holding `model.json` (the
//! [`ModelDescription`]) and `settings.json` (the [`RunParams`]). The command
//! is started inside that directory and must leave a `result.json` of the
//! form `{"nominal": <f64>, "std_dev": <f64>}`. The directory is removed when
//! the run finishes.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::schema::{Measurement, RunParams};

use super::model::ModelDescription;
use super::simulator::{SimulationError, Simulator};

/// Environment variable naming the cross-section library.
pub const CROSS_SECTIONS_ENV: &str = "OPENMC_CROSS_SECTIONS";
pub const MODEL_FILE: &str = "model.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const RESULT_FILE: &str = "result.json";

const STDOUT_FILE: &str = "stdout.log";
const STDERR_FILE: &str = "stderr.log";
const POLL_INTERVAL: Duration = Duration::from_millis(20);
const STDERR_TAIL: usize = 2000;

/// Runs an external program once per evaluation.
#[derive(Debug, Clone)]
pub struct CommandSimulator {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    cross_sections: Option<PathBuf>,
    scratch_root: Option<PathBuf>,
}

impl CommandSimulator {
    /// `args` may contain `{workdir}`, `{model}`, `{settings}` and `{threads}`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
            cross_sections: None,
            scratch_root: None,
        }
    }

    /// Kill runs exceeding `timeout`; they count as failures.
    ///
    /// Only the spawned process is killed. A wrapper (say `sh run.sh`) that
    /// starts the transport code as its own child leaves that grandchild
    /// running; have the wrapper `exec` the code so the kill reaches it.
    /// The run still returns [`SimulationError::Timeout`] on time either way.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cross-section library exported to the child process only.
    pub fn with_cross_sections(mut self, path: PathBuf) -> Self {
        self.cross_sections = Some(path);
        self
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: PathBuf) -> Self {
        self.scratch_root = Some(root);
        self
    }

    fn expand_arg(arg: &str, workdir: &Path, params: &RunParams) -> String {
        arg.replace("{workdir}", &workdir.to_string_lossy())
            .replace("{model}", &workdir.join(MODEL_FILE).to_string_lossy())
            .replace("{settings}", &workdir.join(SETTINGS_FILE).to_string_lossy())
            .replace("{threads}", &params.threads.to_string())
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, SimulationError> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait()?);
        };
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if start.elapsed() >= timeout {
                // already exited or unkillable: either way the run is lost
                let _ = child.kill();
                let _ = child.wait();
                return Err(SimulationError::Timeout(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SimulationError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    // dropping a BufWriter swallows write errors
    writer.flush()?;
    Ok(())
}

/// Last `STDERR_TAIL` bytes of the child's stderr, on a char boundary.
fn stderr_tail(workdir: &Path) -> String {
    let text = fs::read_to_string(workdir.join(STDERR_FILE)).unwrap_or_default();
    let text = text.trim();
    let mut start = text.len().saturating_sub(STDERR_TAIL);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

impl Simulator for CommandSimulator {
    fn run(
        &self,
        model: &ModelDescription,
        params: &RunParams,
    ) -> Result<Measurement, SimulationError> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("eval-");
            b
        };
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let workdir = scratch.path();

        write_json(&workdir.join(MODEL_FILE), model)?;
        write_json(&workdir.join(SETTINGS_FILE), params)?;

        let mut command = Command::new(&self.program);
        command
            .args(
                self.args
                    .iter()
                    .map(|a| Self::expand_arg(a, workdir, params)),
            )
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(File::create(workdir.join(STDOUT_FILE))?)
            .stderr(File::create(workdir.join(STDERR_FILE))?);
        if let Some(path) = &self.cross_sections {
            command.env(CROSS_SECTIONS_ENV, path);
        }

        log::debug!("running {} in {}", self.program, workdir.display());
        let mut child = command.spawn()?;
        let status = self.wait(&mut child)?;
        if !status.success() {
            return Err(SimulationError::Process {
                status: status.to_string(),
                stderr: stderr_tail(workdir),
            });
        }

        let raw = fs::read_to_string(workdir.join(RESULT_FILE))
            .map_err(|e| SimulationError::InvalidOutput(format!("{RESULT_FILE}: {e}")))?;
        let measurement: Measurement = serde_json::from_str(&raw)
            .map_err(|e| SimulationError::InvalidOutput(format!("{RESULT_FILE}: {e}")))?;
        if !measurement.nominal.is_finite() || !measurement.std_dev.is_finite() {
            return Err(SimulationError::Divergence(format!(
                "non-finite estimate {} +/- {}",
                measurement.nominal, measurement.std_dev
            )));
        }
        Ok(measurement)
    }
}
