//! Terminal-local settings, persisted in the `local_settings` table.
//!
//! Each section is stored as one JSON value under category `terminal`.
//! The logo and the video background are stored as `data:` URLs.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use super::{lock, ActionResult, Status};
use crate::collection::merge_changes;
use crate::db::{self, DbState};

const CATEGORY: &str = "terminal";
const GENERAL_KEY: &str = "general";
const VIDEO_KEY: &str = "video";
const PRINT_KEY: &str = "print";
const LOGO_KEY: &str = "logo";
const VIDEO_BACKGROUND_KEY: &str = "video_background";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralSettings {
    pub terminal_name: String,
    pub location: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            terminal_name: "Terminal #1".into(),
            location: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSettings {
    pub video_url: String,
    pub enabled: bool,
    /// Idle seconds before the video starts.
    pub timeout: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            video_url: String::new(),
            enabled: false,
            timeout: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrintSettings {
    pub printer_name: String,
    pub paper_size: String,
    pub show_logo: bool,
    #[serde(rename = "showQR")]
    pub show_qr: bool,
    pub show_barcode: bool,
    pub show_footer: bool,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            printer_name: "Thermal Printer".into(),
            paper_size: "80mm".into(),
            show_logo: true,
            show_qr: true,
            show_barcode: false,
            show_footer: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalSettings {
    pub general: GeneralSettings,
    pub video: VideoSettings,
    pub print: PrintSettings,
}

// ---------------------------------------------------------------------------
// Data URLs
// ---------------------------------------------------------------------------

/// Encode `bytes` as `data:<mime>;base64,...`.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes))
}

/// Split a base64 `data:` URL into its MIME type and bytes.
pub fn parse_data_url(url: &str) -> Result<(String, Vec<u8>), String> {
    let rest = url.strip_prefix("data:").ok_or("Not a data URL")?;
    let (meta, payload) = rest.split_once(',').ok_or("Malformed data URL")?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or("Only base64 data URLs are supported")?;
    let bytes = BASE64_STANDARD
        .decode(payload)
        .map_err(|e| format!("Invalid data URL payload: {e}"))?;
    Ok((mime.to_string(), bytes))
}

fn check_media(mime: &str, bytes: &[u8], kind: &str, what: &str) -> Result<(), String> {
    let mime = mime.trim().to_ascii_lowercase();
    if !mime.starts_with(&format!("{kind}/")) || mime.len() <= kind.len() + 1 {
        return Err(format!("Invalid file for {what}: expected {kind}/*, got '{mime}'"));
    }
    if bytes.is_empty() {
        return Err(format!("Invalid file for {what}: empty"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SettingsState {
    settings: TerminalSettings,
    logo: Option<String>,
    video_background: Option<String>,
    status: Status,
}

pub struct SettingsStore {
    db: Arc<DbState>,
    state: Mutex<SettingsState>,
}

impl SettingsStore {
    pub fn new(db: Arc<DbState>) -> Self {
        Self {
            db,
            state: Mutex::new(SettingsState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SettingsState> {
        lock(&self.state)
    }

    fn finish<T>(&self, result: Result<T, String>) -> ActionResult<T> {
        let result = match result {
            Ok(v) => ActionResult::ok(v),
            Err(e) => {
                warn!(error = %e, "settings action failed");
                ActionResult::fail(e)
            }
        };
        self.state().status.finish(&result);
        result
    }

    /// Read every section from the cache. Missing or unreadable sections
    /// fall back to their defaults.
    pub fn load(&self) -> ActionResult<TerminalSettings> {
        self.state().status.begin();
        let result = (|| -> Result<TerminalSettings, String> {
            let conn = self.db.conn.lock().map_err(|e| e.to_string())?;
            let settings = TerminalSettings {
                general: read_section(&conn, GENERAL_KEY),
                video: read_section(&conn, VIDEO_KEY),
                print: read_section(&conn, PRINT_KEY),
            };
            let logo = db::get_setting(&conn, CATEGORY, LOGO_KEY);
            let video_background = db::get_setting(&conn, CATEGORY, VIDEO_BACKGROUND_KEY);
            drop(conn);

            let mut state = self.state();
            state.settings = settings.clone();
            state.logo = logo;
            state.video_background = video_background;
            Ok(settings)
        })();
        self.finish(result)
    }

    /// Write every section to the cache.
    pub fn save(&self) -> ActionResult<()> {
        self.state().status.begin();
        let settings = self.settings();
        let result = (|| -> Result<(), String> {
            let conn = self.db.conn.lock().map_err(|e| e.to_string())?;
            write_section(&conn, GENERAL_KEY, &settings.general)?;
            write_section(&conn, VIDEO_KEY, &settings.video)?;
            write_section(&conn, PRINT_KEY, &settings.print)?;
            info!("terminal settings saved");
            Ok(())
        })();
        self.finish(result)
    }

    pub fn settings(&self) -> TerminalSettings {
        self.state().settings.clone()
    }

    pub fn general(&self) -> GeneralSettings {
        self.state().settings.general.clone()
    }

    pub fn video(&self) -> VideoSettings {
        self.state().settings.video.clone()
    }

    pub fn print(&self) -> PrintSettings {
        self.state().settings.print.clone()
    }

    /// Apply partial changes (camelCase keys) to the general section.
    pub fn update_general(&self, changes: &Value) -> ActionResult<GeneralSettings> {
        self.update_section(GENERAL_KEY, changes, |s| &mut s.general)
    }

    pub fn update_video(&self, changes: &Value) -> ActionResult<VideoSettings> {
        self.update_section(VIDEO_KEY, changes, |s| &mut s.video)
    }

    pub fn update_print(&self, changes: &Value) -> ActionResult<PrintSettings> {
        self.update_section(PRINT_KEY, changes, |s| &mut s.print)
    }

    fn update_section<S>(
        &self,
        key: &str,
        changes: &Value,
        section: impl Fn(&mut TerminalSettings) -> &mut S,
    ) -> ActionResult<S>
    where
        S: Serialize + DeserializeOwned + Clone,
    {
        self.state().status.begin();
        let result = (|| -> Result<S, String> {
            let current = section(&mut self.state().settings).clone();
            let updated = merge_changes(&current, changes)?;
            let conn = self.db.conn.lock().map_err(|e| e.to_string())?;
            write_section(&conn, key, &updated)?;
            drop(conn);
            *section(&mut self.state().settings) = updated.clone();
            info!(section = key, "terminal settings updated");
            Ok(updated)
        })();
        self.finish(result)
    }

    // -----------------------------------------------------------------------
    // Media
    // -----------------------------------------------------------------------

    /// Store an image as the terminal logo. Returns the data URL.
    pub fn set_logo(&self, mime: &str, bytes: &[u8]) -> ActionResult<String> {
        let result = check_media(mime, bytes, "image", "logo").and_then(|()| {
            let url = to_data_url(mime.trim(), bytes);
            self.write_media(LOGO_KEY, Some(&url))?;
            self.state().logo = Some(url.clone());
            Ok(url)
        });
        self.finish(result)
    }

    pub fn logo(&self) -> Option<String> {
        self.state().logo.clone()
    }

    pub fn clear_logo(&self) -> ActionResult<()> {
        let result = self.write_media(LOGO_KEY, None).map(|()| {
            self.state().logo = None;
        });
        self.finish(result)
    }

    /// Store a video as the idle-screen background. Returns the data URL.
    pub fn set_video_background(&self, mime: &str, bytes: &[u8]) -> ActionResult<String> {
        let result = check_media(mime, bytes, "video", "video background").and_then(|()| {
            let url = to_data_url(mime.trim(), bytes);
            self.write_media(VIDEO_BACKGROUND_KEY, Some(&url))?;
            self.state().video_background = Some(url.clone());
            Ok(url)
        });
        self.finish(result)
    }

    pub fn video_background(&self) -> Option<String> {
        self.state().video_background.clone()
    }

    fn write_media(&self, key: &str, url: Option<&str>) -> Result<(), String> {
        let conn = self.db.conn.lock().map_err(|e| e.to_string())?;
        match url {
            Some(url) => db::set_setting(&conn, CATEGORY, key, url),
            None => db::delete_setting(&conn, CATEGORY, key),
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().status.last_error.clone()
    }

    /// Settings belong to the terminal and survive a logout; only the error
    /// state is cleared.
    pub fn reset(&self) {
        self.state().status = Status::default();
    }
}

fn read_section<S: DeserializeOwned + Default>(conn: &rusqlite::Connection, key: &str) -> S {
    let Some(raw) = db::get_setting(conn, CATEGORY, key) else {
        return S::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(section = key, error = %e, "unreadable settings section, using defaults");
        S::default()
    })
}

fn write_section<S: Serialize>(conn: &rusqlite::Connection, key: &str, value: &S) -> Result<(), String> {
    let raw = serde_json::to_string(value).map_err(|e| e.to_string())?;
    db::set_setting(conn, CATEGORY, key, &raw)
}
