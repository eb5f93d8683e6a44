use anyhow::Result;
use std::path::PathBuf;

const CASTFLOW_DIR: &str = ".castflow";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the CastFlow data directory.
const CASTFLOW_DIR_ENV: &str = "CASTFLOW_DIR";

/// Resolve the CastFlow data directory.
/// Priority: CASTFLOW_DIR env var > ~/.castflow/
pub fn resolve_castflow_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CASTFLOW_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(CASTFLOW_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Get the logs directory: ~/.castflow/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = resolve_castflow_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
