//! Getting the local inference server into a usable state at startup.
//!
//! [`Bootstrapper::ensure_ready`] walks through
//!
//! ```text
//! Unreachable ──launch + poll──▶ ReachableNoModel ──▶ Pulling ──▶ Ready
//!      │                               │                 │        ▲
//!      │                               │                 └────────┴── re-probe after the pull
//!      │                               └──────────────────────────── model already installed
//!      └── gives up after `wait`, or at once when nothing was launched
//! ```
//!
//! Only reachability is a hard requirement. A missing model is pulled on a
//! best-effort basis; if that fails the pet still starts and every `ask`
//! falls back to canned replies until the model shows up.

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument, warn};

use crate::types::base_model_name;
use crate::types::pull::{PullProgress, PullStreamEvent};
use crate::ModelClient;

/// Where the server stands during startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Unreachable,
    ReachableNoModel,
    Pulling,
    Ready,
}

/// Starts the inference server process.
pub trait ServerLauncher: Send + Sync {
    /// Returns `true` if a start was attempted. The server may still take a
    /// while to come up.
    fn launch(&self) -> bool;
}

/// Launches Ollama the way the host OS expects: the app bundle on macOS,
/// `ollama serve` elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ServerLauncher for SystemLauncher {
    fn launch(&self) -> bool {
        let mut command = if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.args(["-a", "Ollama"]);
            command
        } else {
            let mut command = Command::new("ollama");
            command.arg("serve");
            command
        };
        let spawned = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                // Reap the child whenever it exits so it never lingers as a zombie.
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
                true
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!(error = %_e, "could not start the inference server");
                false
            }
        }
    }
}

/// A launcher that never starts anything, for servers managed elsewhere.
///
/// With it, an unreachable server is reported after a single probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLauncher;

impl ServerLauncher for NoLauncher {
    fn launch(&self) -> bool {
        false
    }
}

type StateObserver = Arc<dyn Fn(ReadinessState) + Send + Sync>;

pub struct Bootstrapper {
    client: ModelClient,
    launcher: Arc<dyn ServerLauncher>,
    observer: Option<StateObserver>,
    wait: Duration,
    poll_interval: Duration,
}

impl Bootstrapper {
    pub fn new(client: ModelClient) -> Self {
        Self {
            client,
            launcher: Arc::new(SystemLauncher),
            observer: None,
            wait: Duration::from_secs(45),
            poll_interval: Duration::from_millis(1200),
        }
    }

    pub fn launcher(mut self, launcher: Arc<dyn ServerLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Called with every state the bootstrap enters, in order.
    pub fn on_state<F>(mut self, observer: F) -> Self
    where
        F: Fn(ReadinessState) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// How long to wait for a freshly launched server.
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// `true` unless the server stayed unreachable for the whole wait window.
    ///
    /// Whether the model ended up installed does not affect the result; use
    /// [`Bootstrapper::bootstrap`] to find out.
    pub async fn ensure_ready<F>(&self, on_progress: F) -> bool
    where
        F: FnMut(&PullProgress),
    {
        self.bootstrap(on_progress).await != ReadinessState::Unreachable
    }

    /// Runs startup to completion and reports the final state, which is
    /// never [`ReadinessState::Pulling`].
    #[cfg_attr(feature = "tracing", instrument(skip(self, on_progress), fields(model = %self.client.model())))]
    pub async fn bootstrap<F>(&self, on_progress: F) -> ReadinessState
    where
        F: FnMut(&PullProgress),
    {
        let reachable = self.wait_until_reachable().await;
        self.enter(reachable);
        if reachable == ReadinessState::Unreachable {
            #[cfg(feature = "tracing")]
            warn!("inference server unreachable");
            return reachable;
        }

        if self.probe_model().await == ReadinessState::Ready {
            self.enter(ReadinessState::Ready);
            return ReadinessState::Ready;
        }

        #[cfg(feature = "tracing")]
        info!("model missing, pulling");
        self.enter(ReadinessState::Pulling);
        self.pull_model(on_progress).await;

        let settled = self.probe_model().await;
        self.enter(settled);
        settled
    }

    fn enter(&self, state: ReadinessState) {
        #[cfg(feature = "tracing")]
        debug!(?state, "readiness");
        if let Some(observer) = &self.observer {
            observer(state);
        }
    }

    async fn wait_until_reachable(&self) -> ReadinessState {
        if self.client.is_available().await {
            return ReadinessState::ReachableNoModel;
        }

        if !self.launcher.launch() {
            #[cfg(feature = "tracing")]
            debug!("no server launch attempted, nothing to wait for");
            return ReadinessState::Unreachable;
        }

        let deadline = tokio::time::Instant::now() + self.wait;
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(self.poll_interval).await;
            if self.client.is_available().await {
                return ReadinessState::ReachableNoModel;
            }
        }
        ReadinessState::Unreachable
    }

    /// `Ready` when an installed model has the requested base name.
    async fn probe_model(&self) -> ReadinessState {
        let wanted = base_model_name(self.client.model());
        let installed = self.client.list_models().await;
        if installed.iter().any(|tag| base_model_name(tag) == wanted) {
            ReadinessState::Ready
        } else {
            ReadinessState::ReachableNoModel
        }
    }

    /// Streams a pull of the configured model, reporting each status line.
    ///
    /// Returns `true` when the stream ran to its end without an error. A
    /// failure only ends the pull; it is logged, never raised.
    pub async fn pull_model<F>(&self, mut on_progress: F) -> bool
    where
        F: FnMut(&PullProgress),
    {
        let mut stream = match self.client.pull(self.client.model()).await {
            Ok(stream) => stream,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                warn!(error = %_e, "pull request failed");
                return false;
            }
        };

        while let Some(event) = stream.next().await {
            match event {
                Ok(PullStreamEvent::Status(status)) => on_progress(&PullProgress::from(&status)),
                Ok(PullStreamEvent::Partial { .. }) => continue,
                Ok(PullStreamEvent::Error(_message)) => {
                    #[cfg(feature = "tracing")]
                    warn!(error = %_message, "server reported pull error");
                    return false;
                }
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    warn!(error = %_e, "pull stream broke off");
                    return false;
                }
            }
        }
        true
    }
}
