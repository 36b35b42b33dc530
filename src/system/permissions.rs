//! Permission answers for hosts without a platform consent dialog

use crate::config::PermissionMode;
use async_trait::async_trait;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use fieldtrack_core_interface::{PermissionPort, PermissionScope, PermissionStatus};
use tracing::warn;

/// Answers every request the same way, as decided by configuration
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions {
    foreground: PermissionStatus,
    background: PermissionStatus,
}

impl StaticPermissions {
    pub fn new(foreground: PermissionStatus, background: PermissionStatus) -> Self {
        Self {
            foreground,
            background,
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    pub fn denied() -> Self {
        Self::new(PermissionStatus::Denied, PermissionStatus::Denied)
    }
}

#[async_trait]
impl PermissionPort for StaticPermissions {
    async fn request_foreground(&self) -> PermissionStatus {
        self.foreground
    }

    async fn request_background(&self) -> PermissionStatus {
        self.background
    }
}

/// Asks the operator on the terminal
///
/// Anything other than an explicit "yes" (including a closed terminal) is
/// reported as `Undetermined`, which the controller treats as not granted.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptPermissions;

impl PromptPermissions {
    pub fn new() -> Self {
        Self
    }

    async fn ask(scope: PermissionScope) -> PermissionStatus {
        let prompt = match scope {
            PermissionScope::Foreground => {
                "Allow Fieldtrack to read this device's location?".to_string()
            }
            PermissionScope::Background => format!(
                "Allow Fieldtrack to keep reporting location in the background? {}",
                style("(shown while tracking is active)").dim()
            ),
        };

        let answer = tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(false)
                .interact_opt()
        })
        .await;

        match answer {
            Ok(Ok(Some(true))) => PermissionStatus::Granted,
            Ok(Ok(Some(false))) => PermissionStatus::Denied,
            Ok(Ok(None)) => PermissionStatus::Undetermined,
            Ok(Err(e)) => {
                warn!(%scope, "Permission prompt failed: {}", e);
                PermissionStatus::Undetermined
            }
            Err(e) => {
                warn!(%scope, "Permission prompt aborted: {}", e);
                PermissionStatus::Undetermined
            }
        }
    }
}

#[async_trait]
impl PermissionPort for PromptPermissions {
    async fn request_foreground(&self) -> PermissionStatus {
        Self::ask(PermissionScope::Foreground).await
    }

    async fn request_background(&self) -> PermissionStatus {
        Self::ask(PermissionScope::Background).await
    }
}

/// Non-interactive permission port for a configured mode
///
/// Returns `None` for `PermissionMode::Prompt`, which needs a terminal.
pub fn static_for_mode(mode: PermissionMode) -> Option<StaticPermissions> {
    match mode {
        PermissionMode::Granted => Some(StaticPermissions::granted()),
        PermissionMode::Denied => Some(StaticPermissions::denied()),
        PermissionMode::Prompt => None,
    }
}
