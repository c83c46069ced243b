use std::time::Duration;

use crate::models::{MixerModel, ModelProfile};

/// Resolved settings for one mixer instance.
///
/// Every `Option` falls back to the model default when unset.
#[derive(Debug, Clone, PartialEq)]
pub struct MixerOptions {
    pub model: MixerModel,
    pub host: String,
    pub port: Option<u16>,
    pub delay: Option<Duration>,
    /// Tags to compile; empty means every row
    pub include: Vec<String>,
    pub renew_interval: Option<Duration>,
    pub liveness_window: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub scene_settle: Option<Duration>,
}

impl MixerOptions {
    pub fn new(model: MixerModel, host: impl Into<String>) -> Self {
        Self {
            model,
            host: host.into(),
            port: None,
            delay: None,
            include: Vec::new(),
            renew_interval: None,
            liveness_window: None,
            connect_timeout: None,
            scene_settle: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn include<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn renew_interval(mut self, interval: Duration) -> Self {
        self.renew_interval = Some(interval);
        self
    }

    pub fn liveness_window(mut self, window: Duration) -> Self {
        self.liveness_window = Some(window);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn scene_settle(mut self, settle: Duration) -> Self {
        self.scene_settle = Some(settle);
        self
    }

    /// Model profile with this instance's overrides applied
    pub fn profile(&self) -> ModelProfile {
        let mut profile = self.model.profile();
        if let Some(port) = self.port {
            profile.port = port;
        }
        if let Some(delay) = self.delay {
            profile.delay = delay;
        }
        if let Some(interval) = self.renew_interval {
            profile.renew_interval = interval;
        }
        if let Some(window) = self.liveness_window {
            profile.liveness_window = window;
        }
        if let Some(timeout) = self.connect_timeout {
            profile.connect_timeout = timeout;
        }
        if let Some(settle) = self.scene_settle {
            profile.scene_settle = settle;
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_come_from_model() {
        let profile = MixerOptions::new(MixerModel::XR18, "10.0.0.2").profile();
        assert_eq!(profile.port, 10024);
        assert_eq!(profile.delay, Duration::from_millis(2));
    }

    #[test]
    fn test_overrides_apply() {
        let options = MixerOptions::new(MixerModel::Wing, "wing.local")
            .port(2224)
            .delay(Duration::from_millis(10))
            .include(["channels", "mains"])
            .liveness_window(Duration::from_secs(30));
        let profile = options.profile();
        assert_eq!(profile.port, 2224);
        assert_eq!(profile.delay, Duration::from_millis(10));
        assert_eq!(profile.liveness_window, Duration::from_secs(30));
        assert_eq!(profile.renew_interval, Duration::from_secs(9));
        assert_eq!(options.include, vec!["channels", "mains"]);
    }
}
