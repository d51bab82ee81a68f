//! Correction daemon
//!
//! Shares one orchestrator between the IPC connections and the two log
//! watchers, starts and stops watchers as transitions request, and tears
//! everything down on SIGINT, SIGTERM or a shutdown request.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use crate::activation::Compositor;
use crate::constants::timing;
use crate::ipc::{Connection, IpcServer, Request, Response};
use crate::orchestrator::{Orchestrator, WatcherDirective};
use crate::watchers::{
    ColorEvent, ColorLogParser, LogSources, MonitorLogParser, WatcherHandle, cancelled, run_lines,
};

const COLOR_WATCHER: &str = "color";
const MONITOR_WATCHER: &str = "monitor";

#[derive(Default)]
struct Watchers {
    color: Option<WatcherHandle>,
    monitor: Option<WatcherHandle>,
}

pub struct Controller<C: Compositor, L: LogSources> {
    core: Mutex<Orchestrator<C>>,
    watchers: Mutex<Watchers>,
    logs: L,
    color_parser: ColorLogParser,
    monitor_parser: MonitorLogParser,
    shutdown: watch::Sender<bool>,
}

impl<C: Compositor, L: LogSources> Controller<C, L> {
    pub fn new(orchestrator: Orchestrator<C>, logs: L) -> Result<Arc<Self>> {
        let (shutdown, _) = watch::channel(false);
        Ok(Arc::new(Self {
            core: Mutex::new(orchestrator),
            watchers: Mutex::new(Watchers::default()),
            logs,
            color_parser: ColorLogParser::new()?,
            monitor_parser: MonitorLogParser::new()?,
            shutdown,
        }))
    }

    /// Start the watchers the persisted settings ask for and put the current
    /// effect back in place
    pub async fn start(self: &Arc<Self>) {
        let directives = {
            let core = self.core.lock().await;
            if core.enabled() {
                core.direct_effect().await;
            }
            core.startup_directives()
        };
        self.apply_directives(directives).await;
    }

    async fn apply_directives(self: &Arc<Self>, directives: Vec<WatcherDirective>) {
        if directives.is_empty() {
            return;
        }
        let mut watchers = self.watchers.lock().await;
        for directive in directives {
            debug!(directive = ?directive, "Applying watcher directive");
            match directive {
                WatcherDirective::StartColor => {
                    if !watchers.color.as_ref().is_some_and(WatcherHandle::is_live) {
                        watchers.color = self.spawn_color();
                    }
                }
                WatcherDirective::StopColor => {
                    if let Some(handle) = watchers.color.take() {
                        handle.stop().await;
                    }
                }
                WatcherDirective::StartMonitor => {
                    if !watchers.monitor.as_ref().is_some_and(WatcherHandle::is_live) {
                        watchers.monitor = self.spawn_monitor();
                    }
                }
                WatcherDirective::StopMonitor => {
                    if let Some(handle) = watchers.monitor.take() {
                        handle.stop().await;
                    }
                }
            }
        }
    }

    fn spawn_color(self: &Arc<Self>) -> Option<WatcherHandle> {
        let source = self
            .logs
            .color()
            .inspect_err(|e| error!(error = ?e, "Failed to open color log stream"))
            .ok()?;
        let ctl = Arc::clone(self);
        Some(WatcherHandle::spawn(COLOR_WATCHER, move |token| {
            run_lines(COLOR_WATCHER, source, token, move |line| {
                let ctl = Arc::clone(&ctl);
                async move { ctl.on_color_line(line).await }
            })
        }))
    }

    fn spawn_monitor(self: &Arc<Self>) -> Option<WatcherHandle> {
        let source = self
            .logs
            .monitor()
            .inspect_err(|e| warn!(error = ?e, "External monitor watcher not started"))
            .ok()?;
        let ctl = Arc::clone(self);
        Some(WatcherHandle::spawn(MONITOR_WATCHER, move |token| {
            run_lines(MONITOR_WATCHER, source, token, move |line| {
                let ctl = Arc::clone(&ctl);
                async move { ctl.on_monitor_line(line).await }
            })
        }))
    }

    async fn on_color_line(&self, line: String) {
        let Some(event) = self.color_parser.parse(&line) else {
            return;
        };

        match event {
            // focus and game state calls own app tracking
            ColorEvent::AppId(appid) => info!(appid = appid, "AppId seen in log"),
            ColorEvent::Colorspace(profile) => {
                info!(profile = %profile, "Colorspace change in log");
                self.core.lock().await.on_colorspace(profile).await;
            }
            ColorEvent::GameStopped => self.core.lock().await.on_game_stopped_log().await,
        }
    }

    async fn on_monitor_line(self: &Arc<Self>, line: String) {
        let Some(external) = self.monitor_parser.parse(&line) else {
            return;
        };
        info!(external = external, "Display change in log");
        let directives = self.core.lock().await.on_external_monitor_change(external).await;
        self.apply_directives(directives).await;
    }

    /// Run one host operation
    pub async fn dispatch(self: &Arc<Self>, request: Request) -> Response {
        let mut core = self.core.lock().await;
        let directives = match request {
            Request::Ping => return Response::Pong,
            Request::Shutdown => {
                info!("Received shutdown request via IPC");
                self.shutdown.send_replace(true);
                return Response::Ok;
            }

            Request::GetEnabled => return Response::Bool(core.enabled()),
            Request::SetEnabled { enabled } => core.set_enabled(enabled).await,

            Request::GetDisplayMode => return Response::Text(core.display_mode().to_string()),
            Request::DirectEffect => {
                core.direct_effect().await;
                Vec::new()
            }
            Request::ResumeFromSuspend => {
                core.resume_from_suspend().await;
                Vec::new()
            }

            Request::Brightness { percent } => {
                core.apply_brightness(percent).await;
                Vec::new()
            }
            Request::GetBrightnessEnabled => return Response::Bool(core.brightness_enabled()),
            Request::SetBrightnessEnabled { enabled } => {
                core.set_brightness_enabled(enabled).await;
                Vec::new()
            }

            Request::GetMonitorWatch => return Response::Bool(core.monitor_watch_enabled()),
            Request::SetMonitorWatch { enabled } => core.set_monitor_watch(enabled).await,
            Request::GetExternalSharpenOnly => return Response::Bool(core.external_sharpen_only()),
            Request::SetExternalSharpenOnly { enabled } => core.set_external_sharpen_only(enabled).await,

            Request::GetGrain => return Response::Bool(core.grain()),
            Request::SetGrain { enabled } => {
                core.set_grain(enabled).await;
                Vec::new()
            }
            Request::GetLgg => return Response::Bool(core.lgg()),
            Request::SetLgg { enabled } => {
                core.set_lgg(enabled).await;
                Vec::new()
            }

            Request::GetCas => return Response::Bool(core.cas_enabled()),
            Request::SetCas { enabled } => {
                core.set_cas_enabled(enabled).await;
                Vec::new()
            }
            Request::GetCasStrength => return Response::Number(core.cas_strength()),
            Request::SetCasStrength { strength } => {
                core.set_cas_strength(strength).await;
                Vec::new()
            }

            Request::GetAppOverride { appid } => return Response::Bool(core.app_override(appid)),
            Request::SetAppOverride { appid, enabled } => {
                core.set_app_override(appid, enabled).await;
                Vec::new()
            }
            Request::GetAppCas { appid } => return Response::Bool(core.app_cas_enabled(appid)),
            Request::SetAppCas { appid, enabled } => {
                core.set_app_cas_enabled(appid, enabled).await;
                Vec::new()
            }
            Request::GetAppCasStrength { appid } => return Response::Number(core.app_cas_strength(appid)),
            Request::SetAppCasStrength { appid, strength } => {
                core.set_app_cas_strength(appid, strength).await;
                Vec::new()
            }

            Request::FocusChanged { appid } => {
                core.on_focus_change(appid).await;
                Vec::new()
            }
            Request::GameState { appid, running } => {
                core.on_game_state_change(appid, running).await;
                Vec::new()
            }

            Request::GetHasSeenWelcome => return Response::Bool(core.has_seen_welcome()),
            Request::SetHasSeenWelcome { seen } => {
                core.set_has_seen_welcome(seen);
                Vec::new()
            }

            Request::CheckShaderStatus => return Response::Bool(core.check_shader_status()),
            Request::ReinstallShaders => return Response::Bool(core.reinstall_shaders().await),
            Request::Uninstall => {
                core.uninstall().await;
                Vec::new()
            }
        };

        // watchers may need the core themselves
        drop(core);
        self.apply_directives(directives).await;
        Response::Ok
    }

    async fn serve(self: Arc<Self>, mut conn: Connection) {
        debug!("Host connected");
        loop {
            match conn.recv_request().await {
                Ok(Some(request)) => {
                    debug!(request = ?request, "IPC request");
                    let response = self.dispatch(request).await;
                    if let Err(e) = conn.send_response(&response).await {
                        warn!(error = ?e, "Failed to send IPC response");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = ?e, "IPC connection closed or error");
                    // best effort, the peer may already be gone
                    let _ = conn.send_response(&Response::Error(format!("{e:#}"))).await;
                    break;
                }
            }
        }
        debug!("Host disconnected");
    }

    /// Serve IPC until a signal or a shutdown request, then tear down
    pub async fn run(self: Arc<Self>, server: IpcServer) -> Result<()> {
        let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        let mut shutdown = self.shutdown.subscribe();

        self.start().await;
        info!(socket = %server.path().display(), "Daemon running");

        loop {
            tokio::select! {
                accepted = server.accept() => match accepted {
                    Ok(conn) => {
                        tokio::spawn(Arc::clone(&self).serve(conn));
                    }
                    Err(e) => warn!(error = ?e, "Failed to accept IPC connection"),
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                    break;
                }
                _ = cancelled(&mut shutdown) => break,
            }
        }

        self.teardown().await;
        Ok(())
    }

    /// Stop both watchers, then unload the effect within a bounded wait
    pub async fn teardown(&self) {
        info!("Shutting down");
        let mut watchers = self.watchers.lock().await;
        for handle in [watchers.color.take(), watchers.monitor.take()].into_iter().flatten() {
            handle.stop().await;
        }
        drop(watchers);

        let clear = async { self.core.lock().await.clear_effect().await };
        if tokio::time::timeout(timing::TEARDOWN_CLEAR_TIMEOUT, clear).await.is_err() {
            error!(
                timeout_ms = timing::TEARDOWN_CLEAR_TIMEOUT.as_millis() as u64,
                "Clear effect timed out during shutdown"
            );
        }
    }
}
