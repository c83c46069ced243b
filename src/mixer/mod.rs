//! Public facade over one console
//!
//! `Mixer` ties the compiled mapping, the state store, a transport and the
//! subscription renewal task together. Clones share the same instance.
//!
//! Three things touch the state store: the inbound pump (one task draining
//! the transport's channel), the renewal task, and callers of
//! `set_value`/`reload`. Sends are serialised by `send_lock`, which also
//! holds the per-model inter-message delay, so the pump never waits on it.

mod options;
mod status;

pub use options::MixerOptions;
pub use status::MixerStatus;

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{MixerError, Result};
use crate::mapping::{compile, MappingRow};
use crate::models::{MixerInfo, ModelProfile};
use crate::state::{ChangeRecord, StateStore, UpdateEngine};
use crate::subscription::{LinkState, LivenessMonitor, Transition};
use crate::transport::{Transport, UdpTransport, WireMessage};
use crate::value::MixerValue;

/// Called once per change record, primary before derived fields
pub type ChangeCallback = Arc<dyn Fn(&ChangeRecord) + Send + Sync>;

/// Called with `true` on recovery and `false` on loss of the subscription
pub type LinkStatusCallback = Arc<dyn Fn(bool) + Send + Sync>;

struct Renewal {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Renewal {
    fn stop(self) {
        self.cancel.send_replace(true);
        self.task.abort();
    }
}

struct MixerInner {
    host: String,
    profile: ModelProfile,
    engine: UpdateEngine,
    transport: Arc<dyn Transport>,
    send_lock: tokio::sync::Mutex<()>,
    callback: RwLock<Option<ChangeCallback>>,
    status_callback: RwLock<Option<LinkStatusCallback>>,
    liveness: Mutex<LivenessMonitor>,
    status: RwLock<Option<MixerStatus>>,
    /// Bumped on every inbound message
    inbound_seq: watch::Sender<u64>,
    waiters: Mutex<Vec<(String, oneshot::Sender<Vec<MixerValue>>)>>,
    shutdown: watch::Sender<bool>,
    renewal: Mutex<Option<Renewal>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for MixerInner {
    fn drop(&mut self) {
        if let Some(renewal) = self.renewal.get_mut().take() {
            renewal.stop();
        }
        if let Some(pump) = self.pump.get_mut().take() {
            pump.abort();
        }
    }
}

#[derive(Clone)]
pub struct Mixer {
    inner: Arc<MixerInner>,
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("model", &self.inner.profile.model)
            .field("host", &self.inner.host)
            .field("transport", &self.inner.transport.name())
            .field("addresses", &self.inner.engine.mapping().len())
            .finish()
    }
}

impl Mixer {
    /// Build a mixer over an existing transport. Nothing is sent yet;
    /// inbound messages are fed through [`Mixer::attach_inbound`] or
    /// [`Mixer::handle_message`].
    pub fn new(options: &MixerOptions, transport: Arc<dyn Transport>) -> Result<Self> {
        let profile = options.profile();
        let mapping = compile(
            &profile.cardinalities(),
            &profile.address_specs()?,
            &options.include,
        )?;
        info!(
            "📋 {} mapping compiled: {} addresses",
            profile.model,
            mapping.len()
        );

        let (inbound_seq, _) = watch::channel(0u64);
        let (shutdown, _) = watch::channel(false);
        let liveness = LivenessMonitor::new(profile.liveness_window);

        Ok(Self {
            inner: Arc::new(MixerInner {
                host: options.host.clone(),
                engine: UpdateEngine::new(Arc::new(mapping), StateStore::new()),
                profile,
                transport,
                send_lock: tokio::sync::Mutex::new(()),
                callback: RwLock::new(None),
                status_callback: RwLock::new(None),
                liveness: Mutex::new(liveness),
                status: RwLock::new(None),
                inbound_seq,
                waiters: Mutex::new(Vec::new()),
                shutdown,
                renewal: Mutex::new(None),
                pump: Mutex::new(None),
            }),
        })
    }

    /// Open a UDP socket to the console and start pumping its replies.
    ///
    /// Does not validate the connection; call [`Mixer::start`] for that.
    pub async fn connect(options: &MixerOptions) -> Result<Self> {
        let port = options.profile().port;
        let (transport, inbound) = UdpTransport::connect(&options.host, port).await?;
        let mixer = Self::new(options, Arc::new(transport))?;
        mixer.attach_inbound(inbound)?;
        Ok(mixer)
    }

    /// Drain `inbound` on a background task until `stop` or the channel closes
    pub fn attach_inbound(&self, mut inbound: mpsc::UnboundedReceiver<WireMessage>) -> Result<()> {
        self.ensure_running()?;
        let weak = Arc::downgrade(&self.inner);
        let mut shutdown = self.inner.shutdown.subscribe();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    message = inbound.recv() => {
                        let Some(message) = message else { break };
                        let Some(inner) = weak.upgrade() else { break };
                        Mixer { inner }.handle_message(message);
                    }
                }
            }
            debug!("Inbound pump stopped");
        });

        if let Some(previous) = self.inner.pump.lock().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// A stopped mixer stays stopped; build a new one to reconnect
    fn ensure_running(&self) -> Result<()> {
        if *self.inner.shutdown.borrow() {
            return Err(MixerError::Connection(format!("mixer {} is stopped", self.inner.host)));
        }
        Ok(())
    }

    /// Validate the connection: send the info query and wait for any reply
    pub async fn start(&self) -> Result<()> {
        self.ensure_running()?;
        let profile = &self.inner.profile;
        let mut inbound = self.inner.inbound_seq.subscribe();

        self.send(profile.info_address, &[]).await?;

        match tokio::time::timeout(profile.connect_timeout, inbound.changed()).await {
            Ok(Ok(())) => {
                info!(
                    "✅ Connected to {} ({}) at {}",
                    self.name().unwrap_or_else(|| "mixer".to_string()),
                    profile.model,
                    self.inner.host
                );
                Ok(())
            },
            _ => {
                debug!("No reply to {} from {}", profile.info_address, self.inner.host);
                Err(MixerError::Connection(format!(
                    "no reply from {}:{} within {:?}",
                    self.inner.host, profile.port, profile.connect_timeout
                )))
            },
        }
    }

    /// Stop the renewal task and the inbound pump, then close the transport
    pub async fn stop(&self) -> Result<()> {
        if let Some(renewal) = self.inner.renewal.lock().take() {
            renewal.stop();
        }
        self.inner.liveness.lock().reset();
        self.inner.shutdown.send_replace(true);
        if let Some(pump) = self.inner.pump.lock().take() {
            pump.abort();
        }
        self.inner.transport.close().await?;
        info!("🛑 Mixer {} stopped", self.inner.host);
        Ok(())
    }

    /// Process one inbound message: liveness, pending queries, console
    /// status, then state and change notifications.
    pub fn handle_message(&self, message: WireMessage) {
        let inner = &self.inner;
        let WireMessage { address, args } = message;

        inner.liveness.lock().observe(Instant::now());
        inner.inbound_seq.send_modify(|seq| *seq = seq.wrapping_add(1));

        {
            let mut waiters = inner.waiters.lock();
            let mut idx = 0;
            while idx < waiters.len() {
                if waiters[idx].1.is_closed() {
                    waiters.swap_remove(idx);
                } else if waiters[idx].0 == address {
                    let (_, tx) = waiters.swap_remove(idx);
                    let _ = tx.send(args.clone());
                } else {
                    idx += 1;
                }
            }
        }

        let is_status = inner.profile.status_addresses().contains(&address.as_str());
        if is_status {
            match MixerStatus::parse(&args) {
                Some(status) => *inner.status.write() = Some(status),
                None => debug!(address = %address, "Unrecognised status reply"),
            }
        }

        let records = inner.engine.on_wire_message(&address, &args);
        if is_status || records.is_empty() {
            return;
        }

        let callback = inner.callback.read().clone();
        if let Some(callback) = callback {
            for record in &records {
                callback(record);
            }
        }
    }

    /// Send one message and hold the inter-message delay
    async fn send(&self, address: &str, args: &[MixerValue]) -> Result<()> {
        let _guard = self.inner.send_lock.lock().await;
        debug!(address = %address, ?args, "sending");
        self.inner.transport.send(address, args).await?;
        tokio::time::sleep(self.inner.profile.delay).await;
        Ok(())
    }

    /// Clear the store and request every mapped address again
    pub async fn reload(&self) -> Result<()> {
        self.inner.engine.store().clear();
        let addresses: Vec<String> = self
            .inner
            .engine
            .mapping()
            .wire_addresses()
            .map(str::to_string)
            .collect();
        debug!("Reloading {} addresses", addresses.len());
        for address in &addresses {
            self.send(address, &[]).await?;
        }
        Ok(())
    }

    /// Recall a scene, let the console settle, then reload everything
    pub async fn load_scene(&self, scene: u32) -> Result<()> {
        let profile = &self.inner.profile;
        info!("🎬 Loading scene {}", scene);
        self.send(profile.scene_load_address, &[MixerValue::Text(scene.to_string())])
            .await?;
        if let Some((address, arg)) = profile.scene_execute {
            self.send(address, &[MixerValue::Text(arg.to_string())]).await?;
        }
        tokio::time::sleep(profile.scene_settle).await;
        self.reload().await
    }

    /// Mirrored state.
    ///
    /// With an address, returns that field and everything below it
    /// (`/ch/1` matches `/ch/1/mix_fader`). Without, the whole mirror.
    pub fn state(&self, address: Option<&str>) -> HashMap<String, MixerValue> {
        let snapshot = self.inner.engine.store().snapshot();
        match address {
            None => snapshot,
            Some(prefix) => {
                let prefix = prefix.trim_end_matches('/');
                snapshot
                    .into_iter()
                    .filter(|(key, _)| {
                        key == prefix
                            || key
                                .strip_prefix(prefix)
                                .is_some_and(|rest| rest.starts_with('/'))
                    })
                    .collect()
            },
        }
    }

    /// Single mirrored value
    pub fn value(&self, address: &str) -> Option<MixerValue> {
        self.inner.engine.store().get(address)
    }

    /// Write a logical field, then ask the console for its value back.
    ///
    /// Exactly two messages go out: the encoded value and a read request
    /// on the same wire address.
    pub async fn set_value(&self, address: &str, value: impl Into<MixerValue>) -> Result<()> {
        let write = self.inner.engine.encode_write(address, value.into())?;
        if self
            .inner
            .profile
            .status_addresses()
            .contains(&write.address.as_str())
        {
            return Err(MixerError::ReadOnlyField(address.to_string()));
        }

        self.send(&write.address, std::slice::from_ref(&write.value))
            .await?;
        self.send(&write.address, &[]).await
    }

    /// Start receiving change notifications and keep the subscription alive
    pub async fn subscribe<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&ChangeRecord) + Send + Sync + 'static,
    {
        self.ensure_running()?;
        if let Some(previous) = self.inner.renewal.lock().take() {
            previous.stop();
        }
        *self.inner.callback.write() = Some(Arc::new(callback));
        self.inner.liveness.lock().begin_subscribe();

        if let Err(e) = self.send(self.inner.profile.subscribe_address, &[]).await {
            self.inner.callback.write().take();
            self.inner.liveness.lock().reset();
            return Err(e);
        }
        self.inner.liveness.lock().subscribed(Instant::now());

        let (cancel, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(renewal_loop(
            Arc::downgrade(&self.inner),
            cancel_rx,
            self.inner.shutdown.subscribe(),
            self.inner.profile.renew_interval,
        ));
        if let Some(previous) = self.inner.renewal.lock().replace(Renewal { cancel, task }) {
            previous.stop();
        }

        info!(
            "📡 Subscribed to {} (renew every {:?})",
            self.inner.host, self.inner.profile.renew_interval
        );
        Ok(())
    }

    /// Stop the renewal task and drop the callback. Safe to call repeatedly.
    pub async fn unsubscribe(&self) -> Result<()> {
        if let Some(renewal) = self.inner.renewal.lock().take() {
            renewal.stop();
        }
        self.inner.callback.write().take();
        self.inner.liveness.lock().reset();
        self.send(self.inner.profile.unsubscribe_address, &[]).await
    }

    /// One renewal tick: renew, probe, re-evaluate liveness
    async fn renew(&self) {
        let profile = &self.inner.profile;
        for address in [profile.renew_address, profile.info_address] {
            if let Err(e) = self.send(address, &[]).await {
                warn!("⚠️  Renewal send {} failed: {}", address, e);
            }
        }

        let transition = self.inner.liveness.lock().evaluate(Instant::now());
        match transition {
            Some(Transition::Recovered) => {
                info!("✅ Subscription to {} recovered, reloading state", self.inner.host);
                if let Err(e) = self.reload().await {
                    warn!("⚠️  Reload after recovery failed: {}", e);
                }
                self.notify_link(true);
            },
            Some(Transition::Lost) => {
                warn!(
                    "⚠️  No message from {} for {:?}, subscription degraded",
                    self.inner.host, profile.liveness_window
                );
                self.notify_link(false);
            },
            None => {},
        }
    }

    fn notify_link(&self, connected: bool) {
        let callback = self.inner.status_callback.read().clone();
        if let Some(callback) = callback {
            callback(connected);
        }
    }

    /// Callback for subscription loss/recovery
    pub fn subscription_status_register<F>(&self, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        *self.inner.status_callback.write() = Some(Arc::new(callback));
    }

    /// Whether a message arrived inside the liveness window
    pub fn subscription_connected(&self) -> bool {
        self.inner.liveness.lock().is_connected(Instant::now())
    }

    pub fn link_state(&self) -> LinkState {
        self.inner.liveness.lock().state()
    }

    /// Time since the last inbound message, if any arrived
    pub fn last_received(&self) -> Option<Duration> {
        self.inner
            .liveness
            .lock()
            .last_message_at()
            .map(|at| at.elapsed())
    }

    /// Send a read and wait briefly for the raw reply
    pub async fn query(&self, address: &str) -> Result<Option<Vec<MixerValue>>> {
        let (tx, rx) = oneshot::channel();
        self.inner.waiters.lock().push((address.to_string(), tx));
        self.send(address, &[]).await?;

        match tokio::time::timeout(self.inner.profile.connect_timeout, rx).await {
            Ok(Ok(values)) => Ok(Some(values)),
            _ => {
                self.inner.waiters.lock().retain(|(_, tx)| !tx.is_closed());
                Ok(None)
            },
        }
    }

    /// `(wire, logical)` pairs sorted by wire address
    pub fn dump_mapping(&self) -> Vec<MappingRow> {
        self.inner.engine.mapping().dump()
    }

    pub fn info(&self) -> MixerInfo {
        self.inner.profile.info()
    }

    pub fn profile(&self) -> &ModelProfile {
        &self.inner.profile
    }

    pub fn status(&self) -> Option<MixerStatus> {
        self.inner.status.read().clone()
    }

    pub fn name(&self) -> Option<String> {
        self.inner.status.read().as_ref().map(|s| s.name.clone())
    }

    pub fn firmware(&self) -> Option<String> {
        self.inner.status.read().as_ref().map(|s| s.firmware.clone())
    }
}

async fn renewal_loop(
    mixer: Weak<MixerInner>,
    mut cancel: watch::Receiver<bool>,
    mut shutdown: watch::Receiver<bool>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !*shutdown.borrow() {
        tokio::select! {
            biased;
            _ = cancel.changed() => break,
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {},
        }
        let Some(inner) = mixer.upgrade() else { break };
        Mixer { inner }.renew().await;
    }
    debug!("Subscription renewal stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MixerModel;
    use crate::transport::MemoryTransport;
    use tokio::time::sleep;

    fn memory_mixer(model: MixerModel, include: &[&str]) -> (Mixer, MemoryTransport) {
        let transport = MemoryTransport::new();
        let options = MixerOptions::new(model, "127.0.0.1").include(include.iter().copied());
        let mixer = Mixer::new(&options, Arc::new(transport.clone())).unwrap();
        (mixer, transport)
    }

    fn xinfo_reply() -> WireMessage {
        WireMessage::new(
            "/xinfo",
            ["192.168.1.20", "FOH", "X32", "4.06"]
                .iter()
                .map(|s| MixerValue::from(*s))
                .collect(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fails_without_reply() {
        let (mixer, transport) = memory_mixer(MixerModel::X32, &["mains"]);
        let err = mixer.start().await.unwrap_err();
        assert!(matches!(err, MixerError::Connection(_)));
        assert_eq!(transport.sent_to("/xinfo").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_succeeds_and_records_status_silently() {
        let (mixer, _transport) = memory_mixer(MixerModel::X32, &["mains"]);
        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notified);
        mixer.subscribe(move |r| sink.lock().push(r.clone())).await.unwrap();

        let starter = mixer.clone();
        let handle = tokio::spawn(async move { starter.start().await });
        sleep(Duration::from_millis(1)).await;
        mixer.handle_message(xinfo_reply());

        handle.await.unwrap().unwrap();
        assert_eq!(mixer.name().as_deref(), Some("FOH"));
        assert_eq!(mixer.firmware().as_deref(), Some("4.06"));
        assert!(notified.lock().is_empty());
        assert!(mixer.value("/status").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_then_read() {
        let (mixer, transport) = memory_mixer(MixerModel::X32, &["mains"]);
        mixer.set_value("/main/st/mix_fader", 0.75).await.unwrap();

        assert_eq!(
            transport.take(),
            vec![
                WireMessage::new("/main/st/mix/fader", vec![MixerValue::Float(0.75)]),
                WireMessage::new("/main/st/mix/fader", vec![]),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_errors_send_nothing() {
        let (mixer, transport) = memory_mixer(MixerModel::X32, &["mains"]);
        assert!(matches!(
            mixer.set_value("/ch/1/mix_fader", 0.5).await,
            Err(MixerError::UnknownAddress(_))
        ));
        assert!(matches!(
            mixer.set_value("/status", "x").await,
            Err(MixerError::ReadOnlyField(_))
        ));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_follow_message_order() {
        let (mixer, _transport) = memory_mixer(MixerModel::X32, &["mains"]);
        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notified);
        mixer
            .subscribe(move |r| sink.lock().push(r.address.clone()))
            .await
            .unwrap();

        mixer.handle_message(WireMessage::new(
            "/main/st/mix/fader",
            vec![MixerValue::Float(0.75)],
        ));
        mixer.handle_message(WireMessage::new("/unmapped", vec![MixerValue::Int(1)]));
        mixer.handle_message(WireMessage::new("/main/st/mix/on", vec![MixerValue::Int(1)]));

        assert_eq!(
            *notified.lock(),
            vec!["/main/st/mix_fader", "/main/st/mix_fader_db", "/main/st/mix_on"]
        );
        assert_eq!(mixer.value("/main/st/mix_fader_db"), Some(MixerValue::Float(0.0)));
        assert_eq!(mixer.state(Some("/main/st")).len(), 3);
        mixer.unsubscribe().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_loss_and_single_reload() {
        let (mixer, transport) = memory_mixer(MixerModel::X32, &["mains"]);
        let links = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&links);
        mixer.subscription_status_register(move |connected| sink.lock().push(connected));
        mixer.subscribe(|_| {}).await.unwrap();
        assert!(mixer.subscription_connected());

        // First renewal at 9s, still inside the window
        sleep(Duration::from_secs(10)).await;
        assert!(links.lock().is_empty());
        assert_eq!(transport.sent_to("/xremote").len(), 2);

        // Second renewal at 18s, silent for longer than 15s
        sleep(Duration::from_secs(9)).await;
        assert_eq!(*links.lock(), vec![false]);
        assert_eq!(mixer.link_state(), LinkState::Degraded);
        assert!(!mixer.subscription_connected());

        transport.take();
        mixer.handle_message(WireMessage::new("/main/st/mix/on", vec![MixerValue::Int(0)]));
        assert!(mixer.subscription_connected());

        // Third renewal at 27s notices the recovery and reloads once
        sleep(Duration::from_secs(9)).await;
        assert_eq!(*links.lock(), vec![false, true]);
        assert_eq!(mixer.link_state(), LinkState::Active);
        assert_eq!(transport.sent_to("/main/st/mix/fader").len(), 1);
        // Reload cleared the mirror
        assert_eq!(mixer.value("/main/st/mix_on"), None);

        // Fourth renewal while traffic continues: no further reload
        mixer.handle_message(WireMessage::new("/main/st/mix/on", vec![MixerValue::Int(1)]));
        sleep(Duration::from_secs(9)).await;
        assert_eq!(transport.sent_to("/main/st/mix/fader").len(), 1);
        assert_eq!(*links.lock(), vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_stops_renewal() {
        let (mixer, transport) = memory_mixer(MixerModel::X32, &["mains"]);
        mixer.subscribe(|_| {}).await.unwrap();
        mixer.unsubscribe().await.unwrap();
        mixer.unsubscribe().await.unwrap();
        assert_eq!(mixer.link_state(), LinkState::Idle);

        transport.take();
        sleep(Duration::from_secs(30)).await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_mixer_refuses_to_restart() {
        let (mixer, transport) = memory_mixer(MixerModel::X32, &["mains"]);
        mixer.stop().await.unwrap();

        let err = mixer.subscribe(|_| {}).await.unwrap_err();
        assert!(matches!(err, MixerError::Connection(_)));
        assert!(matches!(mixer.start().await, Err(MixerError::Connection(_))));
        let (_tx, rx) = mpsc::unbounded_channel();
        assert!(matches!(mixer.attach_inbound(rx), Err(MixerError::Connection(_))));
        assert_eq!(mixer.link_state(), LinkState::Idle);

        transport.take();
        sleep(Duration::from_secs(30)).await;
        assert!(transport.sent_to("/xremote").is_empty());
        assert!(transport.sent().is_empty());
    }

    struct DeadTransport;

    #[async_trait::async_trait]
    impl Transport for DeadTransport {
        fn name(&self) -> &str {
            "dead"
        }

        async fn send(&self, _address: &str, _args: &[MixerValue]) -> Result<()> {
            Err(MixerError::Transport("network unreachable".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_subscribe_leaves_no_callback() {
        let options = MixerOptions::new(MixerModel::X32, "127.0.0.1").include(["mains"]);
        let mixer = Mixer::new(&options, Arc::new(DeadTransport)).unwrap();
        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notified);

        let err = mixer
            .subscribe(move |r| sink.lock().push(r.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, MixerError::Transport(_)));
        assert_eq!(mixer.link_state(), LinkState::Idle);

        mixer.handle_message(WireMessage::new("/main/st/mix/on", vec![MixerValue::Int(1)]));
        assert!(notified.lock().is_empty());
        assert!(!mixer.state(None).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_requests_every_address() {
        let (mixer, transport) = memory_mixer(MixerModel::X32, &["mains"]);
        mixer.handle_message(WireMessage::new("/main/st/mix/on", vec![MixerValue::Int(1)]));
        mixer.reload().await.unwrap();

        assert!(mixer.state(None).is_empty());
        let sent: Vec<String> = transport.sent().into_iter().map(|m| m.address).collect();
        let expected: Vec<String> = mixer.dump_mapping().into_iter().map(|r| r.wire).collect();
        assert_eq!(sent, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wing_scene_load() {
        let (mixer, transport) = memory_mixer(MixerModel::Wing, &["show"]);
        mixer.load_scene(4).await.unwrap();

        let sent = transport.sent();
        assert_eq!(
            sent[0],
            WireMessage::new("/$ctl/lib/$actionidx", vec![MixerValue::from("4")])
        );
        assert_eq!(
            sent[1],
            WireMessage::new("/$ctl/lib/$action", vec![MixerValue::from("GO")])
        );
        assert_eq!(sent.len(), 2 + mixer.dump_mapping().len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_returns_reply() {
        let (mixer, _transport) = memory_mixer(MixerModel::X32, &["mains"]);
        let querier = mixer.clone();
        let handle = tokio::spawn(async move { querier.query("/main/st/config/name").await });
        sleep(Duration::from_millis(1)).await;
        mixer.handle_message(WireMessage::new(
            "/main/st/config/name",
            vec![MixerValue::from("LR")],
        ));
        assert_eq!(
            handle.await.unwrap().unwrap(),
            Some(vec![MixerValue::from("LR")])
        );

        assert_eq!(mixer.query("/nothing").await.unwrap(), None);
    }
}
