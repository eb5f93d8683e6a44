use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{err:#}").to_lowercase();

    if msg.contains("node not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  List available nodes with:");
        eprintln!("  {} castflow nodes", "$".dimmed());
    }

    if msg.contains("browser runtime unavailable") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check Node.js and Playwright with:");
        eprintln!("  {} castflow probe", "$".dimmed());
        eprintln!("  Install Playwright with:");
        eprintln!("  {} npm install playwright && npx playwright install chromium", "$".dimmed());
    }

    if msg.contains("cookie file") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Export the platform's cookies while logged in and pass the file with:");
        eprintln!("  {} castflow run <node> --input cookie_file=<path>", "$".dimmed());
    }

    std::process::exit(1);
}
