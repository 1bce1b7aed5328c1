use std::path::Path;

use crate::registry;
use crate::trigger::TriggerFile;

pub fn validate(path: &Path) -> anyhow::Result<()> {
    let trigger = TriggerFile::from_file(path)?;
    let metric_name = registry::validate(&trigger.kind, &trigger.scaler_config())?;
    println!("✓ {} trigger is valid, metric {metric_name}", trigger.kind);
    Ok(())
}
