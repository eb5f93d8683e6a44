use anyhow::Result;
use castflow_browser::PlaywrightLauncher;
use colored::Colorize;

use crate::output::progress::spinner;
use crate::output::{OutputFormat, json::print_json};

pub async fn run(launcher: &PlaywrightLauncher, format: OutputFormat) -> Result<()> {
    let probe = if format.is_json() {
        launcher.probe_runtime().await
    } else {
        let progress = spinner("Probing browser runtime");
        let probe = launcher.probe_runtime().await;
        progress.finish_and_clear();
        probe
    };

    if format.is_json() {
        return print_json(&probe);
    }

    let mark = |ok: bool| {
        if ok {
            "✓".green().bold()
        } else {
            "✗".red().bold()
        }
    };
    println!(
        "{} Node.js {}",
        mark(probe.node_available),
        probe.node_version.as_deref().unwrap_or("not found")
    );
    println!(
        "{} Playwright package",
        mark(probe.playwright_package_available)
    );
    println!(
        "{} Chromium download",
        mark(probe.chromium_cache_detected)
    );
    for note in &probe.notes {
        println!("  {}", note.dimmed());
    }
    if probe.ready {
        println!("\nBrowser runtime: {}", "ready".green());
    } else {
        println!("\nBrowser runtime: {}", "not ready".red());
    }
    Ok(())
}
