use anyhow::{Context, Result, anyhow, bail};
use castflow_core::{NodeLogger, NodeRegistry, TracingLogger};
use colored::Colorize;
use indicatif::ProgressBar;
use serde_json::{Map, Value};
use std::path::Path;

use crate::cli::RunArgs;
use crate::output::progress::spinner;
use crate::output::{OutputFormat, json::print_json};

/// Narrates node progress above the spinner and into the log file.
struct ConsoleLogger {
    progress: Option<ProgressBar>,
    tracing: TracingLogger,
}

impl ConsoleLogger {
    fn print(&self, line: String) {
        match &self.progress {
            Some(progress) => progress.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl NodeLogger for ConsoleLogger {
    fn info(&self, message: &str) {
        self.tracing.info(message);
        self.print(format!("{} {message}", "•".blue()));
    }

    fn warning(&self, message: &str) {
        self.tracing.warning(message);
        self.print(format!("{} {message}", "!".yellow().bold()));
    }

    fn error(&self, message: &str) {
        self.tracing.error(message);
        self.print(format!("{} {message}", "✗".red().bold()));
    }
}

pub async fn run(args: RunArgs, registry: &NodeRegistry, format: OutputFormat) -> Result<()> {
    let node = registry
        .get(&args.node)
        .ok_or_else(|| anyhow!("node not found: {}", args.node))?;
    let inputs = collect_inputs(args.inputs_file.as_deref(), &args.inputs)?;

    let progress = (!format.is_json()).then(|| spinner(&format!("Running {}", node.name())));
    let result = if format.is_json() {
        node.execute(&inputs, &TracingLogger::new(node.id())).await
    } else {
        let logger = ConsoleLogger {
            progress: progress.clone(),
            tracing: TracingLogger::new(node.id()),
        };
        node.execute(&inputs, &logger).await
    };
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    if format.is_json() {
        print_json(&result)?;
    } else if result.success {
        println!("{} {}", "✓".green().bold(), result.message);
    }

    if !result.success {
        return match result.stage {
            Some(stage) => Err(anyhow!(result.message)
                .context(format!("{} failed during {stage}", node.id()))),
            None => Err(anyhow!(result.message)),
        };
    }
    Ok(())
}

/// Merge `--inputs-file` with `--input KEY=VALUE` pairs. Values stay text;
/// nodes parse booleans and tag lists themselves.
fn collect_inputs(file: Option<&Path>, pairs: &[String]) -> Result<Value> {
    let mut inputs = match file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read inputs file {}", path.display()))?;
            match serde_json::from_str::<Value>(&content)
                .with_context(|| format!("Invalid JSON in inputs file {}", path.display()))?
            {
                Value::Object(map) => map,
                _ => bail!("Inputs file {} must contain a JSON object", path.display()),
            }
        }
        None => Map::new(),
    };

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid input `{pair}`, expected KEY=VALUE");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid input `{pair}`, key is empty");
        }
        inputs.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(Value::Object(inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_pairs_override_file_inputs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inputs.json");
        std::fs::write(&path, r#"{"title": "from file", "tags": ["a", "b"]}"#).unwrap();

        let inputs = collect_inputs(
            Some(&path),
            &["title=from flag".to_string(), "description=x=y".to_string()],
        )
        .unwrap();
        assert_eq!(
            inputs,
            json!({ "title": "from flag", "tags": ["a", "b"], "description": "x=y" })
        );
    }

    #[test]
    fn test_malformed_pairs_are_rejected() {
        assert!(collect_inputs(None, &["title".to_string()]).is_err());
        assert!(collect_inputs(None, &["=value".to_string()]).is_err());
    }

    #[test]
    fn test_inputs_file_must_be_an_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inputs.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let error = collect_inputs(Some(&path), &[]).unwrap_err();
        assert!(error.to_string().contains("must contain a JSON object"));
    }
}
