// MIT License - Copyright (c) 2026 Peter Wright
// Cooperative dispatch loop

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::engine::{DiffEngine, DispatchContext};
use crate::smtp::{LineTransport, SmtpSession};
use crate::source::PanelSource;
use crate::ws::{InboundAction, WsAdapter, WsEvent};

/// Owns all notification state and drives it one tick at a time.
///
/// Nothing else touches the snapshot, the dispatch context or the client
/// table; socket tasks talk to the dispatcher only through `ws_events`.
pub struct Dispatcher<S: PanelSource, T: LineTransport> {
    source: S,
    engine: DiffEngine,
    context: DispatchContext,
    smtp: Option<SmtpSession<T>>,
    ws: WsAdapter,
    ws_events: mpsc::UnboundedReceiver<WsEvent>,
    tick_interval: Duration,
}

impl<S: PanelSource, T: LineTransport> Dispatcher<S, T> {
    /// The SMTP session is created only when email is enabled in `config`.
    pub fn new(
        config: &Config,
        source: S,
        transport: T,
        ws_events: mpsc::UnboundedReceiver<WsEvent>,
    ) -> Self {
        let partitions = source.snapshot().partition_count();
        let smtp = config
            .smtp
            .enabled
            .then(|| SmtpSession::new(config.smtp.clone(), transport));
        Self {
            source,
            engine: DiffEngine::new(),
            context: DispatchContext::new(
                partitions,
                config.dispatch.view_partition.saturating_sub(1),
            ),
            smtp,
            ws: WsAdapter::new(config.websocket.keepalive()),
            ws_events,
            tick_interval: Duration::from_millis(config.dispatch.tick_interval_ms.max(1)),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn context(&self) -> &DispatchContext {
        &self.context
    }

    pub fn engine(&self) -> &DiffEngine {
        &self.engine
    }

    pub fn smtp(&self) -> Option<&SmtpSession<T>> {
        self.smtp.as_ref()
    }

    pub fn ws(&self) -> &WsAdapter {
        &self.ws
    }

    /// One pass: poll the source, take client input, dispatch and deliver.
    /// Returns the number of events dispatched.
    pub async fn tick(&mut self) -> usize {
        self.source.poll();
        self.drain_ws_events();

        let events = self
            .engine
            .dispatch(self.source.snapshot_mut(), &mut self.context);
        for event in &events {
            debug!("Dispatching {}", event.kind());
            self.ws.broadcast(event);
            if let (Some(smtp), Some(email)) = (self.smtp.as_mut(), event.email()) {
                smtp.send_notification(&email.subject, &email.body, &mut self.source)
                    .await;
            }
        }

        self.ws.poll_keepalive(Instant::now());
        events.len()
    }

    fn drain_ws_events(&mut self) {
        while let Ok(event) = self.ws_events.try_recv() {
            let view = self.context.view_partition();
            match self.ws.handle_event(event, view) {
                Some(InboundAction::Resync) => self.context.request_resync(),
                Some(InboundAction::WriteKeys(keys)) => self.source.write_keys(view, &keys),
                Some(InboundAction::ViewPartition(partition)) => {
                    if !self.context.set_view_partition(partition) {
                        debug!("Ignoring view of unknown partition {}", partition + 1);
                    }
                }
                None => {}
            }
        }
    }

    /// Tick every `tick_interval_ms` until `shutdown` resolves, returning its output.
    pub async fn run<F: Future>(&mut self, shutdown: F) -> F::Output {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Dispatcher running, tick every {:?}", self.tick_interval);
        let outcome = loop {
            tokio::select! {
                outcome = &mut shutdown => break outcome,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        };
        if let Some(smtp) = &self.smtp {
            info!(
                "Dispatcher stopped: {} emails sent, {} failed, {} buffer overflows",
                smtp.sessions_sent(),
                smtp.sessions_failed(),
                self.engine.buffer_overflows()
            );
        } else {
            info!(
                "Dispatcher stopped: {} buffer overflows",
                self.engine.buffer_overflows()
            );
        }
        outcome
    }
}
