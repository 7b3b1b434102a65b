//! Output kinds an evaluation run can be told to skip

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Kinds of output an evaluation run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Metrics,
    Plots,
    Attributions,
    Validations,
}

impl OutputKind {
    pub const ALL: [OutputKind; 4] = [
        OutputKind::Metrics,
        OutputKind::Plots,
        OutputKind::Attributions,
        OutputKind::Validations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Metrics => "metrics",
            OutputKind::Plots => "plots",
            OutputKind::Attributions => "attributions",
            OutputKind::Validations => "validations",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown output kind: {s}"))
    }
}

/// Split configured names into recognized kinds and ignored names.
///
/// Ignored names keep their configured order, without repeats.
pub(crate) fn partition_disabled(names: &[String]) -> (BTreeSet<OutputKind>, Vec<String>) {
    let mut disabled = BTreeSet::new();
    let mut ignored: Vec<String> = Vec::new();
    for name in names {
        match name.parse::<OutputKind>() {
            Ok(kind) => {
                disabled.insert(kind);
            }
            Err(_) => {
                tracing::warn!(output = %name, "Ignoring unrecognized disabled output");
                if !ignored.contains(name) {
                    ignored.push(name.clone());
                }
            }
        }
    }
    (disabled, ignored)
}
