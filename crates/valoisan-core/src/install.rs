//! Install/upgrade lifecycle hook.

use std::sync::Arc;

use tracing::info;
use valoisan_platform::messaging::{BackgroundMessaging, TabId};
use valoisan_types::config::{DEFAULT_ONBOARDING_URL, RelayConfig};
use valoisan_types::error::Result;
use valoisan_types::manifest::{InstallDetails, InstallReason};

/// Reacts to the extension being installed or updated.
pub struct InstallHook {
    messaging: Arc<dyn BackgroundMessaging>,
    onboarding_url: String,
}

impl InstallHook {
    pub fn new(messaging: Arc<dyn BackgroundMessaging>) -> Self {
        Self {
            messaging,
            onboarding_url: DEFAULT_ONBOARDING_URL.to_owned(),
        }
    }

    pub fn from_config(messaging: Arc<dyn BackgroundMessaging>, config: &RelayConfig) -> Self {
        Self {
            messaging,
            onboarding_url: config.onboarding_url.clone(),
        }
    }

    pub fn onboarding_url(&self) -> &str {
        &self.onboarding_url
    }

    /// Log the version transition and, on a fresh install only, open the
    /// onboarding page. Returns the onboarding tab when one was opened.
    pub async fn on_installed(&self, details: &InstallDetails) -> Result<Option<TabId>> {
        let manifest = self.messaging.manifest();
        info!(
            reason = %details.reason,
            version = %manifest.version,
            previous_version = details.previous_version.as_deref().unwrap_or("none"),
            name = %manifest.name,
            "extension installed"
        );

        if details.reason != InstallReason::Install {
            return Ok(None);
        }
        let tab = self.messaging.create_tab(&self.onboarding_url).await?;
        info!(tab_id = tab, url = %self.onboarding_url, "opened onboarding page");
        Ok(Some(tab))
    }
}
