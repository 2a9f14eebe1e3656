use std::path::{Path, PathBuf};

use chrono::Local;
use likes_archiver::browser::BrowserSession;
use likes_archiver::cookies::load_cookies;
use likes_archiver::harvest::{run_loop, LoopSettings};
use likes_archiver::paths::AppPaths;
use likes_archiver::pipeline::Pipeline;
use likes_archiver::snapshot::PageSnapshot;
use likes_archiver::store::MediaStore;
use likes_archiver::{logging, Config};

const STATS_RECENT: usize = 10;

enum Mode {
    Live { cycles: Option<u64> },
    FromHtml { file: PathBuf, page_url: Option<String> },
    Stats,
}

fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return Ok(());
    }

    let mut mode = Mode::Live { cycles: None };
    let mut page_url: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--once" => mode = Mode::Live { cycles: Some(1) },
            "--cycles" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| "--cycles requires a value".to_string())?;
                let n: u64 = v
                    .parse()
                    .map_err(|_| format!("--cycles expects a number, got {v}"))?;
                mode = Mode::Live { cycles: Some(n) };
            }
            "--from-html" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| "--from-html requires a file".to_string())?;
                mode = Mode::FromHtml {
                    file: PathBuf::from(v),
                    page_url: None,
                };
            }
            "--page-url" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| "--page-url requires a value".to_string())?;
                page_url = Some(v.to_string());
            }
            "--stats" => mode = Mode::Stats,
            other => return Err(format!("unknown arg: {other} (try --help)")),
        }
        i += 1;
    }
    if let Mode::FromHtml { page_url: slot, .. } = &mut mode {
        *slot = page_url;
    }

    let config = Config::from_env().map_err(|e| e.to_string())?;

    match mode {
        Mode::Stats => run_stats(&config),
        Mode::FromHtml { file, page_url } => run_from_html(&config, &file, page_url),
        Mode::Live { cycles } => run_live(&config, cycles),
    }
}

fn run_live(config: &Config, cycles: Option<u64>) -> Result<(), String> {
    let paths = AppPaths::from_config(config);
    paths.ensure_dirs().map_err(|e| e.to_string())?;
    logging::init(&paths.run_log_path(Local::now())).map_err(|e| e.to_string())?;
    tracing::info!("starting the scraping session");

    let outcome = live_session(config, cycles);
    match &outcome {
        Ok(done) => tracing::info!(cycles = done, "scraping session completed"),
        Err(err) => tracing::error!(error = %err, "scraping session aborted"),
    }
    outcome.map(|_| ()).map_err(|e| e.to_string())
}

fn live_session(config: &Config, cycles: Option<u64>) -> likes_archiver::Result<u64> {
    let cookies = load_cookies(&config.cookies_file)?;
    let pipeline = Pipeline::from_config(config);
    let settings = LoopSettings::from_config(config);

    let session = BrowserSession::launch(config)?;
    session.navigate(&config.target_url)?;
    session.apply_cookies(&cookies, &config.target_url)?;
    session.navigate(&config.likes_url)?;

    let mut done = 0_u64;
    run_loop(&session, &pipeline, &settings, || {
        let stop = cycles.is_some_and(|limit| done >= limit);
        done += 1;
        stop
    })
}

fn run_from_html(
    config: &Config,
    file: &Path,
    page_url: Option<String>,
) -> Result<(), String> {
    let paths = AppPaths::from_config(config);
    paths.ensure_dirs().map_err(|e| e.to_string())?;
    logging::init(&paths.run_log_path(Local::now())).map_err(|e| e.to_string())?;

    let page_url = page_url.unwrap_or_else(|| config.likes_url.clone());
    let snapshot = PageSnapshot::load(file, &page_url).map_err(|e| e.to_string())?;
    let links = snapshot.links();
    tracing::info!(file = %file.display(), anchors = links.len(), "processing saved page");

    let summary = Pipeline::from_config(config)
        .process_batch(&links)
        .map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn run_stats(config: &Config) -> Result<(), String> {
    let store = MediaStore::open(&config.media_db_path).map_err(|e| e.to_string())?;
    let total = store.count().map_err(|e| e.to_string())?;
    let recent = store.recent(STATS_RECENT).map_err(|e| e.to_string())?;
    let paths = AppPaths::from_config(config);

    println!("Store: {}", config.media_db_path.to_string_lossy());
    println!("Images: {}", config.images_dir.to_string_lossy());
    println!("Recorded media: {total}");
    if !recent.is_empty() {
        println!("\nMost recent:");
    }
    for record in recent {
        let on_disk = if paths.asset_path(&record.media_id).exists() {
            "downloaded"
        } else {
            "missing"
        };
        let when = record
            .download_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {when}  @{}/status/{}/photo/{}  {}  [{on_disk}]",
            record.user_name, record.post_id, record.photo_index, record.media_id
        );
    }
    store.close().map_err(|e| e.to_string())
}

fn print_help() {
    println!("likes_archiver - archive photos from a liked-posts timeline\n");
    println!("USAGE:");
    println!("  likes_archiver [OPTIONS]\n");
    println!("MODES:");
    println!("  (default)            Scroll the live timeline until stopped");
    println!("  --once               Run a single poll/scroll cycle");
    println!("  --cycles N           Run N poll/scroll cycles");
    println!("  --from-html FILE     Process a saved page instead of a live browser");
    println!("  --page-url URL       Base URL for --from-html (default: LIKES_URL)");
    println!("  --stats              Show what the store holds\n");
    println!("ENVIRONMENT (also read from .env):");
    println!("  TARGET_URL, LIKES_URL, COOKIES_FILE, MEDIA_DB_PATH, IMAGES_DIR, LOGS_DIR,");
    println!("  CHROME_PATH, HEADLESS, POLL_INTERVAL_SECS, SCROLL_STEPS, SCROLL_PAUSE_MS,");
    println!("  THUMBNAIL_TIMEOUT_SECS, DOWNLOAD_TIMEOUT_SECS, MEDIA_URL_TEMPLATE");
}
