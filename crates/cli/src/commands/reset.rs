//! Record log reset

use crate::output::{print_info, print_success};
use anyhow::{Context, Result};
use monitor_lib::{RecordLog, TruncateOutcome};
use std::path::Path;

pub fn reset(path: &Path) -> Result<()> {
    let outcome = RecordLog::new(path)
        .truncate()
        .with_context(|| format!("Failed to clear {}", path.display()))?;

    match outcome {
        TruncateOutcome::Cleared => print_success(&format!("Cleared {}", path.display())),
        TruncateOutcome::NothingToClear => print_info(&format!(
            "{} does not exist, nothing to clear",
            path.display()
        )),
    }
    Ok(())
}
