use std::str::FromStr;
use serde::Deserialize;

/// What a command mission hands to its dependents as its result.
///
/// - `Stdout`: the process's trimmed standard output, as a `String` value
///   (default behaviour).
/// - `None`: no result; dependents only wait for the command to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    Stdout,
    None,
}

impl Default for CaptureMode {
    fn default() -> Self {
        CaptureMode::Stdout
    }
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdout" => Ok(CaptureMode::Stdout),
            "none" => Ok(CaptureMode::None),
            other => Err(format!(
                "invalid capture mode: {other} (expected \"stdout\" or \"none\")"
            )),
        }
    }
}
