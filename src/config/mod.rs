//! Application configuration
//!
//! Loads the YAML file describing which console to talk to and how.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::mixer::MixerOptions;
use crate::models::MixerModel;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub mixer: MixerConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

/// Console connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MixerConfig {
    pub model: MixerModel,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Pause after every send, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    /// Address table tags to load; empty loads everything
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

/// Subscription timing overrides (milliseconds)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renew_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness_window_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_settle_ms: Option<u64>,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Minimal configuration for a console given on the command line
    pub fn for_host(model: MixerModel, host: impl Into<String>) -> Self {
        Self {
            mixer: MixerConfig {
                model,
                host: host.into(),
                port: None,
                delay_ms: None,
                include: Vec::new(),
            },
            subscription: SubscriptionConfig::default(),
        }
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.mixer.host.trim().is_empty() {
            anyhow::bail!("mixer host cannot be empty");
        }
        if self.mixer.port == Some(0) {
            anyhow::bail!("mixer port cannot be 0");
        }
        if self.mixer.include.iter().any(|tag| tag.trim().is_empty()) {
            anyhow::bail!("include tags cannot be empty");
        }

        let sub = &self.subscription;
        for (name, value) in [
            ("renew_interval_ms", sub.renew_interval_ms),
            ("liveness_window_ms", sub.liveness_window_ms),
            ("connect_timeout_ms", sub.connect_timeout_ms),
        ] {
            if value == Some(0) {
                anyhow::bail!("subscription.{} must be positive", name);
            }
        }

        let profile = self.to_options().profile();
        if profile.renew_interval >= profile.liveness_window {
            anyhow::bail!(
                "renewal interval ({:?}) must be shorter than the liveness window ({:?})",
                profile.renew_interval,
                profile.liveness_window
            );
        }

        Ok(())
    }

    /// Library-level options for this configuration
    pub fn to_options(&self) -> MixerOptions {
        let millis = Duration::from_millis;
        let sub = &self.subscription;
        MixerOptions {
            model: self.mixer.model,
            host: self.mixer.host.clone(),
            port: self.mixer.port,
            delay: self.mixer.delay_ms.map(millis),
            include: self.mixer.include.clone(),
            renew_interval: sub.renew_interval_ms.map(millis),
            liveness_window: sub.liveness_window_ms.map(millis),
            connect_timeout: sub.connect_timeout_ms.map(millis),
            scene_settle: sub.scene_settle_ms.map(millis),
        }
    }
}
