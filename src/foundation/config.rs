use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::core::ControlValue;
use crate::foundation::error::{FilterError, FilterResult};
use crate::session::benchmark::LoopBudget;

/// Number of rotating output slots per backend.
pub const DEFAULT_SLOT_COUNT: usize = 2;
/// Factor the GPU pipeline shrinks the input by before blurring.
pub const DEFAULT_DOWNSAMPLE_FACTOR: u32 = 4;

/// Workbench configuration.
///
/// Every field has a default, so a JSON file only needs the keys it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkbenchOpts {
    /// Output slots allocated per backend (>= 2).
    pub slot_count: usize,
    /// GPU downsample factor applied to both dimensions (>= 1).
    pub downsample_factor: u32,
    /// Warmup phase caps; timings are discarded.
    pub warmup: LoopBudget,
    /// Measurement phase caps; timings are averaged.
    pub measurement: LoopBudget,
    /// Control value in effect before the first submission.
    pub initial_control: ControlValue,
}

impl Default for WorkbenchOpts {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            downsample_factor: DEFAULT_DOWNSAMPLE_FACTOR,
            warmup: LoopBudget::WARMUP,
            measurement: LoopBudget::MEASUREMENT,
            initial_control: ControlValue::MIDPOINT,
        }
    }
}

impl WorkbenchOpts {
    /// Check invariants that the sessions rely on.
    pub fn validate(&self) -> FilterResult<()> {
        if self.slot_count < 2 {
            return Err(FilterError::validation(format!(
                "slot_count must be >= 2, got {}",
                self.slot_count
            )));
        }
        if self.downsample_factor == 0 {
            return Err(FilterError::validation("downsample_factor must be >= 1"));
        }
        self.warmup.validate("warmup")?;
        self.measurement.validate("measurement")?;
        Ok(())
    }

    /// Parse and validate options from a JSON string.
    pub fn from_json_str(json: &str) -> FilterResult<Self> {
        let opts: Self = serde_json::from_str(json).context("parse workbench options JSON")?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read, parse and validate options from a JSON file.
    pub fn from_json_path(path: &Path) -> FilterResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open workbench options '{}'", path.display()))?;
        let opts: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse workbench options '{}'", path.display()))?;
        opts.validate()?;
        Ok(opts)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
