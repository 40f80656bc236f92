// src/mission/command.rs

//! Shell command missions.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::mission::{Mission, MissionFuture, MissionName};
use crate::store::{ResultStore, Value, value};
use crate::types::CaptureMode;

/// Prefix of the environment variables carrying dependency results.
pub const INPUT_ENV_PREFIX: &str = "MISSIONDAG_INPUT_";

/// A mission that runs a shell command.
///
/// String results of direct dependencies are exported to the process as
/// `MISSIONDAG_INPUT_<NAME>`. A non-zero exit status fails the mission.
#[derive(Debug, Clone)]
pub struct CommandMission {
    name: MissionName,
    cmd: String,
    dependencies: Vec<MissionName>,
    capture: CaptureMode,
}

impl CommandMission {
    pub fn new(
        name: impl Into<MissionName>,
        cmd: impl Into<String>,
        dependencies: Vec<MissionName>,
        capture: CaptureMode,
    ) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            dependencies,
            capture,
        }
    }

    async fn run(&self, inputs: &ResultStore) -> Result<Option<Value>> {
        info!(mission = %self.name, cmd = %self.cmd, "starting mission process");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        for (key, val) in input_env(inputs) {
            cmd.env(key, val);
        }

        // Output nobody asked for is not read at all.
        let stdout_cfg = match self.capture {
            CaptureMode::Stdout => Stdio::piped(),
            CaptureMode::None => Stdio::null(),
        };
        cmd.stdin(Stdio::null())
            .stdout(stdout_cfg)
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for mission '{}'", self.name))?;

        // Always consume stderr so buffers don't fill; log at debug.
        if let Some(stderr) = child.stderr.take() {
            let mission = self.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(mission = %mission, "stderr: {}", line);
                }
            });
        }

        let mut stdout = Vec::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_end(&mut stdout)
                .await
                .with_context(|| format!("reading stdout of mission '{}'", self.name))?;
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of mission '{}'", self.name))?;

        let code = status.code().unwrap_or(-1);
        info!(
            mission = %self.name,
            exit_code = code,
            success = status.success(),
            "mission process exited"
        );

        if !status.success() {
            bail!("command `{}` exited with code {}", self.cmd, code);
        }

        Ok(match self.capture {
            CaptureMode::Stdout => {
                let text = String::from_utf8_lossy(&stdout);
                Some(value(text.trim().to_string()))
            }
            CaptureMode::None => None,
        })
    }
}

impl Mission for CommandMission {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[MissionName] {
        &self.dependencies
    }

    fn perform(&self, inputs: Arc<ResultStore>) -> MissionFuture<'_> {
        Box::pin(async move { self.run(&inputs).await })
    }
}

/// Environment variable name for the result of mission `name`.
pub fn input_env_key(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{INPUT_ENV_PREFIX}{suffix}")
}

/// String-valued inputs as environment variables, sorted by key.
fn input_env(inputs: &ResultStore) -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = inputs
        .names()
        .filter_map(|name| {
            let val = inputs.get_as::<String>(name).ok()?;
            Some((input_env_key(name), val.as_ref().clone()))
        })
        .collect();
    vars.sort();
    vars
}
