//! Headless Chromium plumbing
//!
//! - [`setup`]: find or download Chromium and launch it
//! - [`session`]: one shared browser per batch, isolated contexts per lookup
//! - [`page_guard`]: pages close themselves when dropped
//! - [`wait`]: load-state, element and URL polling
//! - [`navigation`]: navigation with escalating wait conditions
//! - [`probe`]: reachability check
//! - [`timeout`]: the deadline wrapper every wait goes through

pub mod navigation;
pub mod page_guard;
pub mod probe;
pub mod session;
pub mod setup;
pub mod timeout;
pub mod wait;

pub use navigation::{NavigationPolicy, NavigationRetrier, NavigationStep};
pub use page_guard::PageGuard;
pub use probe::SiteAvailabilityProbe;
pub use session::{BrowserSession, BrowserWrapper, BrowsingContext};
pub use setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use timeout::with_page_timeout;
pub use wait::WaitCondition;
