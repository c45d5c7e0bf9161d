//! Shared constants for the portal lookups
//!
//! Portal URLs, DOM selectors, sentinel strings and the default timing
//! values. Everything tunable at runtime is mirrored in
//! [`LookupConfig`](crate::config::LookupConfig); these are only defaults.

use std::time::Duration;

// =============================================================================
// Portals
// =============================================================================

/// REINFO index page (ASP.NET WebForms search form)
pub const REINFO_URL: &str = "https://pad.minem.gob.pe/REINFO_WEB/Index.aspx";

/// SUNAT taxpayer consultation entry point
pub const SUNAT_URL: &str =
    "https://e-consultaruc.sunat.gob.pe/cl-ti-itmrconsruc/FrameCriterioBusquedaWeb.jsp";

/// Path suffix SUNAT redirects to once a search is accepted
pub const SUNAT_RESULTS_ROUTE: &str = "jcrS00Alias";

/// Name of the frame SUNAT used to render the search form in
pub const SUNAT_FORM_FRAME: &str = "main";

// =============================================================================
// Selectors
// =============================================================================

pub const REINFO_RUC_INPUT: &str = "#txtruc";
pub const REINFO_SEARCH_BUTTON: &str = "#btnBuscar";
pub const REINFO_RESULTS_TABLE: &str = "#stdregistro";

/// Flattened header label of the unique-code column in the results table
pub const REINFO_CODE_COLUMN: &str = "DERECHO MINERO Código Único";

pub const SUNAT_RUC_INPUT: &str = "#txtRuc";
pub const SUNAT_SUBMIT_BUTTON: &str = "#btnAceptar";
pub const SUNAT_RESULTS_PANEL: &str = ".panel.panel-primary";

// =============================================================================
// Sentinels
// =============================================================================

pub const NO_REINFO: &str = "No tiene REINFO";
pub const INVALID_RESULT: &str = "Resultado inválido";
pub const SITE_UNAVAILABLE: &str = "Sitio no disponible";
pub const TIMEOUT_ERROR: &str = "Error de timeout";
pub const GENERIC_ERROR: &str = "Error";

pub const ACTIVITY_NOT_FOUND: &str = "No encontrado";
pub const ACTIVITY_ERROR: &str = "Error";
pub const ALERT_NORMAL: &str = "Normal";
pub const ALERT_NON_MINING: &str = "⚠️ Actividad no minera";

pub const NO_RECPO: &str = "⚠️ No tiene RECPO";

/// Codes the REINFO portal returns when it serves a stale default table
/// instead of the real answer. Seen on the live site, not documented anywhere.
pub const KNOWN_INVALID_CODES: [&str; 24] = [
    "750001619", "10149108", "660000314", "70013606", "70005506", "50009409",
    "10253815", "10125116", "10078012", "10373105", "10419912", "10003298",
    "740001713", "10285912", "10350212", "740002620", "740000513", "10360012",
    "510000809", "740000820", "10077712", "730001119", "50011003", "10391208",
];

/// Keywords that mark a SUNAT activity as mining related (lowercase)
pub const MINING_KEYWORDS: [&str; 4] = [
    "mineral",
    "minería",
    "extracción",
    "comercialización de minerales",
];

// =============================================================================
// Browser profile
// =============================================================================

/// Desktop user agent presented to both portals
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

pub const VIEWPORT_WIDTH: u32 = 1280;
pub const VIEWPORT_HEIGHT: u32 = 800;
pub const BROWSER_LOCALE: &str = "es-PE";
pub const ACCEPT_LANGUAGE: &str = "es-PE,es;q=0.5";

/// URL patterns aborted on every page. Images, fonts and stylesheets do not
/// affect either form, and skipping them halves page load on REINFO.
pub const BLOCKED_RESOURCE_PATTERNS: [&str; 10] = [
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.svg", "*.ico", "*.css", "*.woff", "*.woff2", "*.ttf",
];

// =============================================================================
// Timing defaults
// =============================================================================

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const NAVIGATION_RETRY_PAUSE: Duration = Duration::from_secs(2);
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
