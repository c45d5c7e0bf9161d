//! Cheap reachability check before spending a full retry budget

use std::time::Duration;
use tracing::{debug, warn};

use super::timeout::with_page_timeout;
use super::wait::WaitCondition;
use crate::portal::{PortalPage, PortalScope};

pub struct SiteAvailabilityProbe;

impl SiteAvailabilityProbe {
    /// Open a page in `scope`, load `url` to DOM-parsed within `timeout`,
    /// close the page. Never fails; any error means unreachable.
    pub async fn is_reachable<S: PortalScope>(scope: &S, url: &str, timeout: Duration) -> bool {
        let mut page = match with_page_timeout(scope.new_page(), timeout, "Probe page").await {
            Ok(page) => page,
            Err(e) => {
                warn!(url, "Site probe could not open a page: {e:#}");
                return false;
            }
        };

        let reachable = match with_page_timeout(
            page.navigate(url, WaitCondition::DomContentLoaded),
            timeout,
            "Site probe",
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(url, "Site not reachable: {e:#}");
                false
            }
        };

        if let Err(e) = with_page_timeout(page.close(), timeout, "Probe page close").await {
            debug!("Probe page close failed: {e:#}");
        }

        debug!(url, reachable, "Site probe finished");
        reachable
    }
}
