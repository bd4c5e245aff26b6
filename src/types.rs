use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// How source edits are turned into regenerated outputs.
///
/// - `Batch`: the supervisor watches the source tree, debounces events and
///   invokes the compiler once per quiet period with the changed files.
/// - `Persistent`: the compiler is started once in its own watch mode and the
///   supervisor only owns the child process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompileStrategy {
    Batch,
    Persistent,
}

impl Default for CompileStrategy {
    fn default() -> Self {
        CompileStrategy::Batch
    }
}

impl FromStr for CompileStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batch" => Ok(CompileStrategy::Batch),
            "persistent" => Ok(CompileStrategy::Persistent),
            other => Err(format!(
                "invalid strategy: {other} (expected \"batch\" or \"persistent\")"
            )),
        }
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

/// `serde` adapter for duration strings in the config file.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}
