use clap::ValueEnum;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Where the `watch` and `list` commands read connections from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Kernel socket tables under /proc/net
    Proc,
    /// A JSON snapshot file, re-read on every poll
    Json(PathBuf),
}

impl FromStr for SourceSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "proc" => Ok(SourceSpec::Proc),
            Some(("json", path)) if !path.is_empty() => Ok(SourceSpec::Json(PathBuf::from(path))),
            _ => Err(format!(
                "invalid source '{s}': expected \"proc\" or \"json:<path>\""
            )),
        }
    }
}
