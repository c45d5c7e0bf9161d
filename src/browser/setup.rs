//! Chromium discovery and launch

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::task;
use tracing::{debug, error, info, trace, warn};

use super::session::BrowserWrapper;
use crate::config::BrowserSettings;
use crate::error::LookupError;

const PATH_ENV_VARS: [&str; 2] = ["VETA_CHROME_PATH", "CHROMIUM_PATH"];

/// Find a Chrome/Chromium executable.
///
/// Order: explicit path, `VETA_CHROME_PATH`, `CHROMIUM_PATH`, platform
/// install locations, then `which` on Unix.
pub fn find_browser_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            info!("Using configured browser: {}", path.display());
            return Ok(path.to_path_buf());
        }
        warn!("Configured browser path does not exist: {}", path.display());
    }

    for var in PATH_ENV_VARS {
        if let Ok(value) = std::env::var(var) {
            let path = PathBuf::from(value);
            if path.exists() {
                info!("Using browser from {var}: {}", path.display());
                return Ok(path);
            }
            warn!("{var} points to non-existent file: {}", path.display());
        }
    }

    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"%LOCALAPPDATA%\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "~/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for candidate in candidates {
        let Some(path) = expand_candidate(candidate) else {
            continue;
        };
        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    info!("Found browser using 'which': {found}");
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    Err(LookupError::Browser("Chrome/Chromium executable not found".to_string()).into())
}

/// Expand `~/` and `%VAR%` in an install path candidate
fn expand_candidate(candidate: &str) -> Option<PathBuf> {
    if let Some(rest) = candidate.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    if candidate.contains('%') {
        return Some(PathBuf::from(expand_windows_env_vars(candidate)));
    }
    Some(PathBuf::from(candidate))
}

/// Replace `%VAR%` tokens with their values; unknown tokens are kept
fn expand_windows_env_vars(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(start) = rest.find('%') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) if !name.is_empty() => result.push_str(&value),
                    _ => {
                        result.push('%');
                        result.push_str(name);
                        result.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}

/// Download a managed Chromium into the user cache directory
pub async fn download_managed_browser() -> Result<PathBuf> {
    info!("Downloading managed Chromium browser...");

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| {
            let fallback = std::env::temp_dir();
            warn!(
                "Could not determine cache directory, using {}",
                fallback.display()
            );
            fallback
        })
        .join("veta_scrape")
        .join("chromium");

    std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let revision_info = fetcher.fetch().await.context("Failed to fetch browser")?;

    info!(
        "Downloaded Chromium to: {}",
        revision_info.folder_path.display()
    );
    Ok(revision_info.executable_path)
}

/// CDP handler errors that come from events chromiumoxide cannot decode.
/// See chromiumoxide issues #167 and #229.
fn is_benign_handler_error(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

/// Command-line switches for the portal profile. Certificate checks stay on.
fn launch_args(settings: &BrowserSettings) -> Vec<String> {
    let mut args = vec![
        format!("--user-agent={}", settings.user_agent),
        format!("--lang={}", settings.locale),
    ];
    args.extend(
        [
            "--disable-blink-features=AutomationControlled",
            "--no-sandbox",
            "--disable-setuid-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--disable-web-security",
            "--disable-features=IsolateOrigins,site-per-process,TranslateUI",
            "--disable-background-timer-throttling",
            "--disable-backgrounding-occluded-windows",
            "--disable-renderer-backgrounding",
            "--disable-background-networking",
            "--disable-extensions",
            "--disable-notifications",
            "--disable-popup-blocking",
            "--disable-breakpad",
            "--disable-hang-monitor",
            "--no-first-run",
            "--no-default-browser-check",
            "--password-store=basic",
            "--use-mock-keychain",
            "--mute-audio",
        ]
        .map(String::from),
    );
    args
}

/// Find (or download) Chromium and launch it with the portal profile
///
/// The returned wrapper owns the CDP handler task and the profile directory.
pub async fn launch_browser(settings: &BrowserSettings) -> Result<BrowserWrapper> {
    let chrome_path = match find_browser_executable(settings.chrome_executable.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            warn!("{e}. Falling back to managed download.");
            download_managed_browser().await?
        }
    };

    // A configured profile dir belongs to the caller and is never removed
    let (user_data_dir, owns_profile) = match &settings.user_data_dir {
        Some(dir) => (dir.clone(), false),
        None => (
            std::env::temp_dir().join(format!("veta_chrome_{}", std::process::id())),
            true,
        ),
    };
    std::fs::create_dir_all(&user_data_dir).context("Failed to create user data directory")?;

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(settings.request_timeout())
        .window_size(settings.viewport_width, settings.viewport_height)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path);

    builder = if settings.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    for arg in launch_args(settings) {
        builder = builder.arg(arg);
    }
    let browser_config = builder
        .build()
        .map_err(|e| LookupError::Browser(format!("Failed to build browser config: {e}")))?;

    debug!(headless = settings.headless, "Launching browser");
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| LookupError::Browser(format!("Failed to launch browser: {e}")))?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                if is_benign_handler_error(&message) {
                    trace!("Suppressed benign CDP error: {message}");
                } else {
                    error!("Browser handler error: {e:?}");
                }
            }
        }
        debug!("Browser handler task completed");
    });

    info!("Browser launched");
    Ok(BrowserWrapper::new(
        browser,
        handler_task,
        owns_profile.then_some(user_data_dir),
    ))
}
