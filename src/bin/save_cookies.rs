use std::io::{BufRead, Write};

use likes_archiver::browser::BrowserSession;
use likes_archiver::cookies::save_cookies;
use likes_archiver::paths::AppPaths;
use likes_archiver::{logging, Config};

fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return Ok(());
    }
    if let Some(other) = args.get(1) {
        return Err(format!("unknown arg: {other} (try --help)"));
    }

    let config = Config::from_env().map_err(|e| e.to_string())?;
    let paths = AppPaths::from_config(&config);
    paths.ensure_dirs().map_err(|e| e.to_string())?;
    logging::init(&paths.cookie_tool_log_path()).map_err(|e| e.to_string())?;

    let outcome = capture(&config);
    if let Err(err) = &outcome {
        tracing::error!(error = %err, "cookie capture failed");
    }
    outcome.map_err(|e| e.to_string())
}

fn capture(config: &Config) -> likes_archiver::Result<()> {
    // Always visible: the user has to log in by hand.
    let session = BrowserSession::launch_with(config, false)?;
    session.navigate(&config.target_url)?;

    println!("Log in within the opened browser window, then press Enter here.");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    let cookies = session.cookies()?;
    save_cookies(&config.cookies_file, &cookies)?;
    tracing::info!(
        count = cookies.len(),
        url = %session.current_url(),
        file = %config.cookies_file.display(),
        "cookies saved"
    );
    println!(
        "Saved {} cookies to {}",
        cookies.len(),
        config.cookies_file.to_string_lossy()
    );
    Ok(())
}

fn print_help() {
    println!("save_cookies - log in once and keep the session cookies\n");
    println!("USAGE:");
    println!("  save_cookies\n");
    println!("Opens a visible browser at TARGET_URL, waits for Enter, then writes");
    println!("the session cookies to COOKIES_FILE (default: cookies.json).");
}
