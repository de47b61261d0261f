//! Command dispatch and event fan-out
//!
//! The [`Bridge`] owns the registry of mounted surfaces. Each surface gets a
//! FIFO command queue ([`SurfaceEndpoint`]) and answers requests through
//! [`Bridge::complete`]. Hosts talk to a surface through a [`ViewHandle`] and
//! listen to it through an [`EventStream`].

use std::collections::{BTreeMap, HashMap};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};

use super::events::{AnnotationsChange, ViewEvent};
use super::pending::{PendingRequests, Resolution, StaleRequest, Undispatched};
use super::types::{
    Command, CommandEnvelope, CommandError, DataReturned, RequestId, Thumbnail, ViewId, ViewMode,
    ViewProps,
};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::instant::{self, Annotation, AnnotationType, Dimensions, IdentityLedger, Validate};
use crate::resource::ResourceWithLink;

// ============================================================================
// Bridge
// ============================================================================

/// Registry of mounted surfaces and their in-flight requests
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    /// Mounted surfaces indexed by view id
    views: RwLock<HashMap<ViewId, MountedView>>,

    /// Requests waiting for a result
    pending: PendingRequests,

    /// Last issued request id
    last_request_id: AtomicU64,

    config: BridgeConfig,
}

struct MountedView {
    commands: mpsc::UnboundedSender<CommandEnvelope>,
    subscribers: Vec<mpsc::UnboundedSender<ViewEvent>>,
    ledger: IdentityLedger,
    props: ViewProps,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                views: RwLock::new(HashMap::new()),
                pending: PendingRequests::new(config.max_in_flight),
                last_request_id: AtomicU64::new(0),
                config,
            }),
        }
    }

    // ========================================================================
    // Surface lifecycle
    // ========================================================================

    /// Register a surface and hand back its command queue
    pub async fn mount(
        &self,
        view_id: ViewId,
        props: ViewProps,
    ) -> Result<SurfaceEndpoint, CommandError> {
        let mut views = self.inner.views.write().await;
        if views.contains_key(&view_id) {
            return Err(CommandError::AlreadyMounted(view_id));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        views.insert(
            view_id,
            MountedView {
                commands: sender,
                subscribers: Vec::new(),
                ledger: IdentityLedger::new(),
                props: props.clone(),
            },
        );

        tracing::info!(
            view_id = %view_id,
            document = props.document.as_ref().map(|d| d.uri.as_str()).unwrap_or("-"),
            "Surface mounted"
        );

        Ok(SurfaceEndpoint {
            view_id,
            props,
            commands: receiver,
        })
    }

    /// Remove a surface; its in-flight requests fail with `ViewDisposed`
    /// and its event streams end
    pub async fn unmount(&self, view_id: ViewId) -> bool {
        let removed = self.inner.views.write().await.remove(&view_id);
        if removed.is_none() {
            return false;
        }

        let rejected = self
            .inner
            .pending
            .reject_view(view_id, CommandError::ViewDisposed(view_id));
        tracing::info!(view_id = %view_id, rejected, "Surface unmounted");
        true
    }

    pub async fn is_mounted(&self, view_id: ViewId) -> bool {
        self.inner.views.read().await.contains_key(&view_id)
    }

    /// Options the surface was mounted with
    pub async fn props(&self, view_id: ViewId) -> Option<ViewProps> {
        self.inner
            .views
            .read()
            .await
            .get(&view_id)
            .map(|view| view.props.clone())
    }

    /// Command handle for one surface; the surface is looked up per call
    pub fn view(&self, view_id: ViewId) -> ViewHandle {
        ViewHandle {
            bridge: self.clone(),
            view_id,
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn next_request_id(&self) -> RequestId {
        RequestId::new(self.inner.last_request_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    async fn enqueue(&self, envelope: CommandEnvelope) -> Result<(), CommandError> {
        let view_id = envelope.view_id;
        let views = self.inner.views.read().await;
        let view = views
            .get(&view_id)
            .ok_or(CommandError::TargetNotFound(view_id))?;
        view.commands
            .send(envelope)
            .map_err(|_| CommandError::TargetNotFound(view_id))
    }

    /// Queue a command that has no result
    pub async fn send(&self, view_id: ViewId, command: Command) -> Result<(), CommandError> {
        command.validate_args()?;
        let name = command.name();
        self.enqueue(CommandEnvelope {
            view_id,
            request_id: None,
            command,
        })
        .await?;
        tracing::debug!(view_id = %view_id, command = name, "Command queued");
        Ok(())
    }

    /// Queue a command and wait for its raw result
    ///
    /// Dropping the returned future abandons the request; its result is
    /// discarded when it arrives.
    pub async fn request(&self, view_id: ViewId, command: Command) -> Result<Value, CommandError> {
        command.validate_args()?;
        let name = command.name();
        let request_id = self.next_request_id();

        // Registered before it is queued, so even an immediate answer finds it.
        let receiver = self.inner.pending.register(request_id, view_id, name)?;
        let guard = Undispatched::new(&self.inner.pending, request_id);
        let envelope = CommandEnvelope {
            view_id,
            request_id: Some(request_id),
            command,
        };
        if let Err(e) = self.enqueue(envelope).await {
            tracing::debug!(view_id = %view_id, request_id = %request_id, command = name, error = %e, "Request not dispatched");
            return Err(e);
        }
        guard.dispatched();
        tracing::debug!(view_id = %view_id, request_id = %request_id, command = name, "Request dispatched");

        match receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(CommandError::ViewDisposed(view_id)),
        }
    }

    /// Deliver a surface's result to the waiting caller
    pub fn complete(&self, returned: DataReturned) -> Resolution {
        let request_id = returned.request_id;
        let outcome = returned.into_outcome().map_err(CommandError::Remote);
        self.inner.pending.resolve(request_id, outcome)
    }

    /// [`Bridge::complete`] for an undecoded result envelope
    pub fn complete_json(&self, raw: &Value) -> Result<Resolution, BridgeError> {
        let returned: DataReturned = serde_json::from_value(raw.clone())?;
        Ok(self.complete(returned))
    }

    pub fn in_flight(&self) -> usize {
        self.inner.pending.len()
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Listen to one surface's events, in emission order
    pub async fn subscribe(&self, view_id: ViewId) -> Result<EventStream, CommandError> {
        let mut views = self.inner.views.write().await;
        let view = views
            .get_mut(&view_id)
            .ok_or(CommandError::TargetNotFound(view_id))?;
        let (sender, receiver) = mpsc::unbounded_channel();
        view.subscribers.push(sender);
        Ok(EventStream { view_id, receiver })
    }

    /// Fan an event out to every subscriber of `view_id`
    ///
    /// Returns the number of subscribers reached.
    pub async fn emit(&self, view_id: ViewId, event: ViewEvent) -> Result<usize, CommandError> {
        let mut views = self.inner.views.write().await;
        let view = views
            .get_mut(&view_id)
            .ok_or(CommandError::TargetNotFound(view_id))?;

        if let ViewEvent::AnnotationsChanged(change) = &event {
            track_identities(view_id, &mut view.ledger, change);
        }

        view.subscribers.retain(|subscriber| !subscriber.is_closed());
        let delivered = view
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.send(event.clone()).is_ok())
            .count();

        tracing::debug!(view_id = %view_id, event = event.name(), delivered, "Event emitted");
        Ok(delivered)
    }

    /// Decode a raw event and emit it; malformed events are logged and dropped
    pub async fn emit_json(&self, view_id: ViewId, raw: &Value) -> Result<usize, BridgeError> {
        let event: ViewEvent = match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(view_id = %view_id, error = %e, "Rejected malformed event");
                return Err(e.into());
            }
        };
        Ok(self.emit(view_id, event).await?)
    }

    // ========================================================================
    // Stale requests
    // ========================================================================

    /// Requests unanswered for longer than the configured threshold
    pub fn stale_requests(&self) -> Vec<StaleRequest> {
        self.inner.pending.stale(self.inner.config.stale_request_after)
    }

    /// Log every stale request; nothing is cancelled
    pub fn sweep_stale(&self) -> usize {
        let stale = self.stale_requests();
        for request in &stale {
            tracing::warn!(
                request_id = %request.request_id,
                view_id = %request.view_id,
                command = request.command,
                age_ms = request.age.as_millis() as u64,
                "Request still waiting for a result"
            );
        }
        stale.len()
    }

    /// Start background stale-request sweep
    pub fn start_stale_sweep_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let period = self
                .inner
                .config
                .stale_request_after
                .max(Duration::from_secs(1));
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;
                self.sweep_stale();
            }
        })
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

fn track_identities(view_id: ViewId, ledger: &mut IdentityLedger, change: &AnnotationsChange) {
    match change {
        AnnotationsChange::Added { annotations } | AnnotationsChange::Changed { annotations } => {
            for annotation in annotations {
                if let Err(e) = ledger.observe(annotation) {
                    tracing::warn!(view_id = %view_id, error = %e, "Annotation identity changed");
                }
            }
        }
        AnnotationsChange::Removed { annotations } => {
            for removed in annotations {
                if let Some(uuid) = &removed.uuid {
                    ledger.forget(uuid);
                }
            }
        }
    }
}

// ============================================================================
// Surface side
// ============================================================================

/// The surface's end of the bridge: commands in queue order
pub struct SurfaceEndpoint {
    pub view_id: ViewId,
    pub props: ViewProps,
    commands: mpsc::UnboundedReceiver<CommandEnvelope>,
}

impl SurfaceEndpoint {
    /// Next queued command; `None` once the view is unmounted
    pub async fn recv(&mut self) -> Option<CommandEnvelope> {
        self.commands.recv().await
    }

    pub fn try_recv(&mut self) -> Option<CommandEnvelope> {
        self.commands.try_recv().ok()
    }
}

/// Events of one surface
pub struct EventStream {
    view_id: ViewId,
    receiver: mpsc::UnboundedReceiver<ViewEvent>,
}

impl EventStream {
    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    /// Next event; `None` once the view is unmounted
    pub async fn recv(&mut self) -> Option<ViewEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ViewEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for EventStream {
    type Item = ViewEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ViewEvent>> {
        self.receiver.poll_recv(cx)
    }
}

// ============================================================================
// Typed commands
// ============================================================================

/// Typed command API for one surface
#[derive(Clone)]
pub struct ViewHandle {
    bridge: Bridge,
    view_id: ViewId,
}

#[derive(Deserialize)]
struct PageThumbnail {
    image: Thumbnail,
}

fn decode_result<T: DeserializeOwned>(command: &'static str, value: Value) -> Result<T, CommandError> {
    serde_json::from_value(value).map_err(|e| CommandError::InvalidResponse {
        command,
        reason: e.to_string(),
    })
}

fn decode_annotations(command: &'static str, value: &Value) -> Result<Vec<Annotation>, CommandError> {
    instant::decode_document(value).map_err(|e| CommandError::InvalidResponse {
        command,
        reason: e.to_string(),
    })
}

impl ViewHandle {
    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    async fn request_as<T: DeserializeOwned>(&self, command: Command) -> Result<T, CommandError> {
        let name = command.name();
        let value = self.bridge.request(self.view_id, command).await?;
        decode_result(name, value)
    }

    pub async fn enter_annotation_creation_mode(&self) -> Result<(), CommandError> {
        self.bridge
            .send(self.view_id, Command::EnterAnnotationCreationMode)
            .await
    }

    pub async fn exit_currently_active_mode(&self) -> Result<(), CommandError> {
        self.bridge
            .send(self.view_id, Command::ExitCurrentlyActiveMode)
            .await
    }

    pub async fn set_left_bar_button_items(
        &self,
        items: Option<Vec<String>>,
        view_mode: Option<ViewMode>,
        animated: bool,
    ) -> Result<(), CommandError> {
        self.bridge
            .send(
                self.view_id,
                Command::SetLeftBarButtonItems {
                    items,
                    view_mode,
                    animated,
                },
            )
            .await
    }

    pub async fn set_right_bar_button_items(
        &self,
        items: Option<Vec<String>>,
        view_mode: Option<ViewMode>,
        animated: bool,
    ) -> Result<(), CommandError> {
        self.bridge
            .send(
                self.view_id,
                Command::SetRightBarButtonItems {
                    items,
                    view_mode,
                    animated,
                },
            )
            .await
    }

    pub async fn save_current_document(&self) -> Result<bool, CommandError> {
        self.request_as(Command::SaveCurrentDocument).await
    }

    /// Annotations on one page, optionally filtered by PDF type
    pub async fn get_annotations(
        &self,
        page_index: u32,
        annotation_type: Option<AnnotationType>,
    ) -> Result<Vec<Annotation>, CommandError> {
        let command = Command::GetAnnotations {
            page_index,
            annotation_type,
        };
        let name = command.name();
        let value = self.bridge.request(self.view_id, command).await?;
        decode_annotations(name, &value)
    }

    pub async fn get_all_annotations(
        &self,
        annotation_type: Option<AnnotationType>,
    ) -> Result<Vec<Annotation>, CommandError> {
        let command = Command::GetAllAnnotations { annotation_type };
        let name = command.name();
        let value = self.bridge.request(self.view_id, command).await?;
        decode_annotations(name, &value)
    }

    pub async fn get_all_unsaved_annotations(&self) -> Result<Vec<Annotation>, CommandError> {
        let command = Command::GetAllUnsavedAnnotations;
        let name = command.name();
        let value = self.bridge.request(self.view_id, command).await?;
        decode_annotations(name, &value)
    }

    pub async fn add_annotation(&self, annotation: &Annotation) -> Result<bool, CommandError> {
        self.request_as(Command::AddAnnotation {
            annotation: annotation.clone(),
        })
        .await
    }

    pub async fn add_annotations(&self, annotations: &[Annotation]) -> Result<bool, CommandError> {
        self.request_as(Command::AddAnnotations {
            annotations: annotations.to_vec(),
        })
        .await
    }

    pub async fn remove_annotation(&self, annotation: &Annotation) -> Result<bool, CommandError> {
        self.request_as(Command::RemoveAnnotation {
            annotation: annotation.clone(),
        })
        .await
    }

    /// Place resource icons; one inner list per target
    pub async fn add_resource_icons(
        &self,
        resources: Vec<Vec<ResourceWithLink>>,
    ) -> Result<bool, CommandError> {
        self.request_as(Command::AddResourceIcons { resources }).await
    }

    pub async fn get_page_size(&self, index: u32) -> Result<Dimensions, CommandError> {
        let dimensions: Dimensions = self.request_as(Command::GetPageSize { index }).await?;
        dimensions
            .validate()
            .map_err(|e| CommandError::InvalidResponse {
                command: "getPageSize",
                reason: e.to_string(),
            })?;
        Ok(dimensions)
    }

    pub async fn get_left_bar_button_items_for_view_mode(
        &self,
        view_mode: Option<ViewMode>,
    ) -> Result<Vec<String>, CommandError> {
        self.request_as(Command::GetLeftBarButtonItemsForViewMode { view_mode })
            .await
    }

    pub async fn get_right_bar_button_items_for_view_mode(
        &self,
        view_mode: Option<ViewMode>,
    ) -> Result<Vec<String>, CommandError> {
        self.request_as(Command::GetRightBarButtonItemsForViewMode { view_mode })
            .await
    }

    pub async fn get_page_thumbnail(&self, page_index: u32) -> Result<Thumbnail, CommandError> {
        let result: PageThumbnail = self
            .request_as(Command::GetPageThumbnail { page_index })
            .await?;
        Ok(result.image)
    }

    /// Thumbnails keyed by page index
    pub async fn get_thumbnails(
        &self,
        page_indexes: &[u32],
    ) -> Result<BTreeMap<u32, Thumbnail>, CommandError> {
        self.request_as(Command::GetThumbnails {
            page_indexes: page_indexes.to_vec(),
        })
        .await
    }
}
