// src/session/liveness.rs — Infer call start/end from an uncooperative video surface
//
// Every signal is untrusted. Nothing counts during the grace period after the
// surface loads, `Ended` needs a prior `Started`, and an end that arrives
// inside the minimum session window is deferred until the window closes.
// Both events are latches: each fires at most once.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::infra::config::LivenessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    Started,
    Ended,
}

/// Meaning of an explicit message posted by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSignal {
    Started,
    Ended,
}

const STARTED_EVENTS: &[&str] = &[
    "conversation.started",
    "system.replica_joined",
    "conversation.replica.started_speaking",
    "conversation.user.started_speaking",
];

const ENDED_EVENTS: &[&str] = &[
    "conversation.ended",
    "system.shutdown",
    "conversation.participant_left",
    "left-meeting",
];

/// Match a posted message against the known start/end shapes.
pub fn classify_message(message: &serde_json::Value) -> Option<ProviderSignal> {
    let name = ["event_type", "type", "event", "action"]
        .iter()
        .find_map(|key| message.get(*key).and_then(|v| v.as_str()))?;

    if STARTED_EVENTS.contains(&name) {
        Some(ProviderSignal::Started)
    } else if ENDED_EVENTS.contains(&name) {
        Some(ProviderSignal::Ended)
    } else {
        None
    }
}

/// Ready state at which a media element has a decoded current frame.
pub const HAVE_CURRENT_DATA: u8 = 2;

/// One poll of the surface's media element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MediaSample {
    pub present: bool,
    pub paused: bool,
    pub ended: bool,
    pub ready_state: u8,
    pub current_time: f64,
}

impl MediaSample {
    /// All weak indicators must agree before the media counts as live.
    pub fn is_active(&self) -> bool {
        self.present
            && !self.paused
            && !self.ended
            && self.ready_state >= HAVE_CURRENT_DATA
            && self.current_time > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceSignal {
    Message(ProviderSignal),
    Media(MediaSample),
}

/// Clock-injected detector state.
#[derive(Debug)]
pub struct LivenessDetector {
    grace: Duration,
    min_session: Duration,
    idle_samples_for_end: u32,
    loaded_at: Instant,
    started_at: Option<Instant>,
    ended: bool,
    pending_end_at: Option<Instant>,
    idle_samples: u32,
}

impl LivenessDetector {
    pub fn new(config: &LivenessConfig, loaded_at: Instant) -> Self {
        Self {
            grace: config.grace_period(),
            min_session: config.min_session(),
            idle_samples_for_end: config.idle_samples_for_end.max(1),
            loaded_at,
            started_at: None,
            ended: false,
            pending_end_at: None,
            idle_samples: 0,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// When a deferred end becomes due, if one is pending.
    pub fn pending_end_at(&self) -> Option<Instant> {
        self.pending_end_at
    }

    fn in_grace(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.loaded_at) < self.grace
    }

    pub fn observe(&mut self, signal: SurfaceSignal, now: Instant) -> Option<LivenessEvent> {
        if self.ended {
            return None;
        }
        if self.in_grace(now) {
            tracing::trace!("Ignoring liveness signal inside grace period: {signal:?}");
            return None;
        }

        match signal {
            SurfaceSignal::Message(ProviderSignal::Started) => self.start(now),
            SurfaceSignal::Message(ProviderSignal::Ended) => self.request_end(now),
            SurfaceSignal::Media(sample) if sample.is_active() => {
                self.idle_samples = 0;
                self.start(now)
            }
            SurfaceSignal::Media(_) => {
                if !self.is_started() {
                    return None;
                }
                self.idle_samples += 1;
                if self.idle_samples >= self.idle_samples_for_end {
                    self.request_end(now)
                } else {
                    None
                }
            }
        }
    }

    /// Release a deferred end once the minimum session window has passed.
    pub fn poll(&mut self, now: Instant) -> Option<LivenessEvent> {
        match self.pending_end_at {
            Some(due) if !self.ended && now >= due => {
                self.pending_end_at = None;
                self.ended = true;
                Some(LivenessEvent::Ended)
            }
            _ => None,
        }
    }

    fn start(&mut self, now: Instant) -> Option<LivenessEvent> {
        if self.started_at.is_some() {
            return None;
        }
        self.started_at = Some(now);
        tracing::debug!("Liveness: conversation started");
        Some(LivenessEvent::Started)
    }

    fn request_end(&mut self, now: Instant) -> Option<LivenessEvent> {
        let Some(started_at) = self.started_at else {
            tracing::debug!("Liveness: discarding end signal with no prior start");
            return None;
        };
        if self.pending_end_at.is_some() {
            return None;
        }

        let earliest = started_at + self.min_session;
        if now >= earliest {
            self.ended = true;
            tracing::debug!("Liveness: conversation ended");
            Some(LivenessEvent::Ended)
        } else {
            tracing::debug!("Liveness: end inside minimum session window, deferring");
            self.pending_end_at = Some(earliest);
            None
        }
    }
}

/// Read-only view of the embedded media element.
#[async_trait]
pub trait MediaSurface: Send + Sync {
    async fn sample(&self) -> Option<MediaSample>;
}

/// Surface for hosts that cannot inspect media; only explicit messages count.
pub struct NullSurface;

#[async_trait]
impl MediaSurface for NullSurface {
    async fn sample(&self) -> Option<MediaSample> {
        None
    }
}

/// Spawn the monitor task feeding `events` until `Ended` latches or the
/// receiver goes away.
pub fn spawn_monitor(
    config: LivenessConfig,
    surface: Arc<dyn MediaSurface>,
    messages: mpsc::Receiver<serde_json::Value>,
    events: mpsc::Sender<LivenessEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run_monitor(config, surface, messages, events))
}

pub async fn run_monitor(
    config: LivenessConfig,
    surface: Arc<dyn MediaSurface>,
    mut messages: mpsc::Receiver<serde_json::Value>,
    events: mpsc::Sender<LivenessEvent>,
) {
    let mut detector = LivenessDetector::new(&config, Instant::now());
    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut messages_open = true;

    loop {
        let deferred = detector.pending_end_at();
        let wake_at = deferred.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        let event = tokio::select! {
            msg = messages.recv(), if messages_open => match msg {
                Some(value) => classify_message(&value)
                    .and_then(|sig| detector.observe(SurfaceSignal::Message(sig), Instant::now())),
                None => {
                    messages_open = false;
                    None
                }
            },
            _ = ticker.tick() => match surface.sample().await {
                Some(sample) => detector.observe(SurfaceSignal::Media(sample), Instant::now()),
                None => None,
            },
            _ = tokio::time::sleep_until(wake_at), if deferred.is_some() => {
                detector.poll(Instant::now())
            }
        };

        let event = event.or_else(|| detector.poll(Instant::now()));
        if let Some(event) = event {
            if events.send(event).await.is_err() {
                break;
            }
        }
        if detector.is_ended() || events.is_closed() {
            break;
        }
    }
}
