// Host frame glue
// Context loading, the add-frame prompt and named event subscription against the host SDK.
// FrameSession registers every listener on mount and removes them all when dropped.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::mf_error::AddFrameError;

/// Number of host events kept for the panel's event strip
pub const EVENT_LOG_LEN: usize = 4;

/// Padding the host asks the frame to keep clear, in terminal cells
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SafeAreaInsets {
    pub top: u16,
    pub bottom: u16,
    pub left: u16,
    pub right: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub added: bool,
    pub safe_area_insets: Option<SafeAreaInsets>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameContext {
    pub client: ClientContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDetails {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    FrameAdded { notification_details: Option<NotificationDetails> },
    FrameAddRejected { reason: String },
    FrameRemoved,
    NotificationsEnabled { notification_details: NotificationDetails },
    NotificationsDisabled,
    PrimaryButtonClicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameEventKind {
    FrameAdded,
    FrameAddRejected,
    FrameRemoved,
    NotificationsEnabled,
    NotificationsDisabled,
    PrimaryButtonClicked,
}

impl FrameEventKind {
    pub const ALL: [FrameEventKind; 6] = [
        FrameEventKind::FrameAdded,
        FrameEventKind::FrameAddRejected,
        FrameEventKind::FrameRemoved,
        FrameEventKind::NotificationsEnabled,
        FrameEventKind::NotificationsDisabled,
        FrameEventKind::PrimaryButtonClicked,
    ];

    /// Event name as used on the host wire
    pub fn name(self) -> &'static str {
        match self {
            FrameEventKind::FrameAdded => "frameAdded",
            FrameEventKind::FrameAddRejected => "frameAddRejected",
            FrameEventKind::FrameRemoved => "frameRemoved",
            FrameEventKind::NotificationsEnabled => "notificationsEnabled",
            FrameEventKind::NotificationsDisabled => "notificationsDisabled",
            FrameEventKind::PrimaryButtonClicked => "primaryButtonClicked",
        }
    }
}

impl FrameEvent {
    pub fn kind(&self) -> FrameEventKind {
        match self {
            FrameEvent::FrameAdded { .. } => FrameEventKind::FrameAdded,
            FrameEvent::FrameAddRejected { .. } => FrameEventKind::FrameAddRejected,
            FrameEvent::FrameRemoved => FrameEventKind::FrameRemoved,
            FrameEvent::NotificationsEnabled { .. } => FrameEventKind::NotificationsEnabled,
            FrameEvent::NotificationsDisabled => FrameEventKind::NotificationsDisabled,
            FrameEvent::PrimaryButtonClicked => FrameEventKind::PrimaryButtonClicked,
        }
    }
}

pub type Listener = Box<dyn FnMut(&FrameEvent)>;

/// Call contract of the host client's SDK
pub trait HostSdk {
    /// Context for this mount, `None` when no host is attached
    fn context(&self) -> Option<FrameContext>;
    fn add_frame(&mut self) -> Result<(), AddFrameError>;
    fn ready(&mut self);
    fn on(&mut self, kind: FrameEventKind, listener: Listener);
    fn remove_all_listeners(&mut self);
}

/// Settings for the local stand-in host
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HostConfig {
    pub added: bool,       // Client already has the frame
    pub accept_add: bool,  // Answer to the add-frame prompt
    pub domain: String,    // Domain of the frame manifest, empty means invalid
    pub safe_area: SafeAreaInsets,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            added: false,
            accept_add: true,
            domain: "localhost".to_string(),
            safe_area: SafeAreaInsets::default(),
        }
    }
}

/// Host implementation used when running in a plain terminal
/// Dispatches events synchronously to listeners registered for their kind
pub struct LocalHost {
    config: HostConfig,
    listeners: HashMap<FrameEventKind, Vec<Listener>>,
    notifications: Option<NotificationDetails>,
    ready: bool,
}

impl LocalHost {
    pub fn new(config: HostConfig) -> Self {
        LocalHost {
            config,
            listeners: HashMap::new(),
            notifications: None,
            ready: false,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    fn emit(&mut self, event: FrameEvent) {
        if let Some(listeners) = self.listeners.get_mut(&event.kind()) {
            for listener in listeners.iter_mut() {
                listener(&event);
            }
        }
    }

    fn notification_details(&self) -> NotificationDetails {
        NotificationDetails {
            url: format!("https://{}/api/notify", self.config.domain),
            token: format!("{:016x}", rand::random::<u64>()),
        }
    }

    /// Remove the frame from the client, as the user would from the host menu
    pub fn remove_frame(&mut self) {
        if !self.config.added {
            return;
        }
        self.config.added = false;
        self.notifications = None;
        self.emit(FrameEvent::FrameRemoved);
    }

    /// Flip notifications; only meaningful while the frame is added
    pub fn set_notifications(&mut self, enabled: bool) {
        if !self.config.added || enabled == self.notifications.is_some() {
            return;
        }
        if enabled {
            let details = self.notification_details();
            self.notifications = Some(details.clone());
            self.emit(FrameEvent::NotificationsEnabled { notification_details: details });
        } else {
            self.notifications = None;
            self.emit(FrameEvent::NotificationsDisabled);
        }
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications.is_some()
    }

    pub fn click_primary_button(&mut self) {
        self.emit(FrameEvent::PrimaryButtonClicked);
    }
}

impl HostSdk for LocalHost {
    fn context(&self) -> Option<FrameContext> {
        Some(FrameContext {
            client: ClientContext {
                added: self.config.added,
                safe_area_insets: Some(self.config.safe_area),
            },
        })
    }

    fn add_frame(&mut self) -> Result<(), AddFrameError> {
        if self.config.domain.trim().is_empty() {
            return Err(AddFrameError::InvalidDomainManifest(
                "frame manifest has no domain".to_string(),
            ));
        }
        if self.config.added {
            return Ok(());
        }
        if !self.config.accept_add {
            self.emit(FrameEvent::FrameAddRejected {
                reason: "rejected_by_user".to_string(),
            });
            return Err(AddFrameError::RejectedByUser(
                "user declined the prompt".to_string(),
            ));
        }
        self.config.added = true;
        let details = self.notification_details();
        self.notifications = Some(details.clone());
        self.emit(FrameEvent::FrameAdded {
            notification_details: Some(details),
        });
        Ok(())
    }

    fn ready(&mut self) {
        self.ready = true;
    }

    fn on(&mut self, kind: FrameEventKind, listener: Listener) {
        self.listeners.entry(kind).or_default().push(listener);
    }

    fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }
}

/// What the panel shows about the host connection
#[derive(Debug, Default)]
pub struct FrameStatus {
    pub added: bool,
    pub ready: bool,
    pub last_add_error: Option<AddFrameError>,
    pub events: VecDeque<String>,
}

impl FrameStatus {
    fn record(&mut self, line: String) {
        if self.events.len() == EVENT_LOG_LEN {
            self.events.pop_front();
        }
        self.events.push_back(line);
    }
}

/// A mounted frame: owns the host for the lifetime of the panel
pub struct FrameSession<H: HostSdk> {
    host: H,
    context: Option<FrameContext>,
    status: Rc<RefCell<FrameStatus>>,
}

impl<H: HostSdk> FrameSession<H> {
    /// Load the context, subscribe to host events, prompt for add, then signal ready
    pub fn mount(mut host: H) -> Self {
        tracing::info!("Calling load");
        let status = Rc::new(RefCell::new(FrameStatus::default()));
        let context = host.context();
        let Some(ctx) = context.clone() else {
            tracing::warn!("no host context, frame stays idle");
            return FrameSession { host, context, status };
        };
        status.borrow_mut().added = ctx.client.added;

        for kind in FrameEventKind::ALL {
            let status = Rc::clone(&status);
            host.on(kind, Box::new(move |event| on_event(&status, event)));
        }

        let mut session = FrameSession { host, context, status };
        if !ctx.client.added {
            session.add_frame();
        }

        tracing::info!("Calling ready");
        session.host.ready();
        session.status.borrow_mut().ready = true;
        session
    }

    /// Ask the host to add the frame; failures only change the status line
    pub fn add_frame(&mut self) {
        let result = self.host.add_frame();
        if let Err(e) = &result {
            tracing::warn!(error = ?e, "add frame failed");
        }
        self.status.borrow_mut().last_add_error = result.err();
    }

    pub fn safe_area(&self) -> SafeAreaInsets {
        self.context
            .as_ref()
            .and_then(|c| c.client.safe_area_insets)
            .unwrap_or_default()
    }

    pub fn status(&self) -> Ref<'_, FrameStatus> {
        self.status.borrow()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: HostSdk> Drop for FrameSession<H> {
    fn drop(&mut self) {
        tracing::debug!("unmounting frame, removing host listeners");
        self.host.remove_all_listeners();
    }
}

fn on_event(status: &RefCell<FrameStatus>, event: &FrameEvent) {
    let name = event.kind().name();
    let mut status = status.borrow_mut();
    match event {
        FrameEvent::FrameAdded { notification_details } => {
            tracing::info!(event = name, has_notifications = notification_details.is_some(), "host event");
            status.added = true;
        }
        FrameEvent::FrameAddRejected { reason } => {
            tracing::info!(event = name, reason = %reason, "host event");
        }
        FrameEvent::FrameRemoved => {
            tracing::info!(event = name, "host event");
            status.added = false;
        }
        FrameEvent::NotificationsEnabled { notification_details } => {
            tracing::info!(event = name, url = %notification_details.url, "host event");
        }
        FrameEvent::NotificationsDisabled | FrameEvent::PrimaryButtonClicked => {
            tracing::info!(event = name, "host event");
        }
    }
    let line = match event {
        FrameEvent::FrameAddRejected { reason } => format!("{} {} ({})", timestamp(), name, reason),
        _ => format!("{} {}", timestamp(), name),
    };
    status.record(line);
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Calls {
        registered: Vec<FrameEventKind>,
        add_frame: usize,
        ready: usize,
        removed_all: usize,
    }

    struct FakeHost {
        context: Option<FrameContext>,
        add_result: Result<(), AddFrameError>,
        calls: Rc<RefCell<Calls>>,
    }

    impl FakeHost {
        fn new(added: Option<bool>) -> (Self, Rc<RefCell<Calls>>) {
            let calls = Rc::new(RefCell::new(Calls::default()));
            let context = added.map(|added| FrameContext {
                client: ClientContext {
                    added,
                    safe_area_insets: Some(SafeAreaInsets { top: 1, bottom: 2, left: 3, right: 4 }),
                },
            });
            let host = FakeHost {
                context,
                add_result: Ok(()),
                calls: Rc::clone(&calls),
            };
            (host, calls)
        }
    }

    impl HostSdk for FakeHost {
        fn context(&self) -> Option<FrameContext> {
            self.context.clone()
        }
        fn add_frame(&mut self) -> Result<(), AddFrameError> {
            self.calls.borrow_mut().add_frame += 1;
            self.add_result.clone()
        }
        fn ready(&mut self) {
            self.calls.borrow_mut().ready += 1;
        }
        fn on(&mut self, kind: FrameEventKind, _listener: Listener) {
            self.calls.borrow_mut().registered.push(kind);
        }
        fn remove_all_listeners(&mut self) {
            self.calls.borrow_mut().removed_all += 1;
        }
    }

    #[test]
    fn mount_registers_all_events_and_drop_removes_them() {
        let (host, calls) = FakeHost::new(Some(true));
        let session = FrameSession::mount(host);
        assert_eq!(calls.borrow().registered, FrameEventKind::ALL.to_vec());
        assert_eq!(calls.borrow().ready, 1);
        assert_eq!(calls.borrow().add_frame, 0);
        assert!(session.status().ready);
        assert_eq!(session.safe_area(), SafeAreaInsets { top: 1, bottom: 2, left: 3, right: 4 });

        drop(session);
        assert_eq!(calls.borrow().removed_all, 1);
    }

    #[test]
    fn mount_prompts_add_when_not_added() {
        let (mut host, calls) = FakeHost::new(Some(false));
        host.add_result = Err(AddFrameError::Other("boom".to_string()));
        let session = FrameSession::mount(host);
        assert_eq!(calls.borrow().add_frame, 1);
        assert_eq!(calls.borrow().ready, 1);
        assert_eq!(
            session.status().last_add_error,
            Some(AddFrameError::Other("boom".to_string()))
        );
    }

    #[test]
    fn mount_without_context_stays_idle() {
        let (host, calls) = FakeHost::new(None);
        let session = FrameSession::mount(host);
        assert!(calls.borrow().registered.is_empty());
        assert_eq!(calls.borrow().ready, 0);
        assert!(!session.status().ready);
        assert_eq!(session.safe_area(), SafeAreaInsets::default());
    }

    #[test]
    fn local_host_accepting_add_marks_added() {
        let session = FrameSession::mount(LocalHost::new(HostConfig::default()));
        let status = session.status();
        assert!(status.added);
        assert!(status.last_add_error.is_none());
        assert_eq!(status.events.len(), 1);
        assert!(status.events[0].ends_with("frameAdded"));
        drop(status);
        assert!(session.host().is_ready());
        assert!(session.host().notifications_enabled());
        assert_eq!(session.host().listener_count(), FrameEventKind::ALL.len());
    }

    #[test]
    fn local_host_rejected_add_reports_and_logs() {
        let config = HostConfig { accept_add: false, ..HostConfig::default() };
        let session = FrameSession::mount(LocalHost::new(config));
        let status = session.status();
        assert!(!status.added);
        assert!(matches!(status.last_add_error, Some(AddFrameError::RejectedByUser(_))));
        assert!(status.events[0].contains("frameAddRejected (rejected_by_user)"));
    }

    #[test]
    fn local_host_without_domain_is_invalid_manifest() {
        let config = HostConfig { domain: String::new(), ..HostConfig::default() };
        let session = FrameSession::mount(LocalHost::new(config));
        assert!(matches!(
            session.status().last_add_error,
            Some(AddFrameError::InvalidDomainManifest(_))
        ));
        assert!(session.status().events.is_empty());
    }

    #[test]
    fn remove_and_notifications_flow_through_listeners() {
        let mut session = FrameSession::mount(LocalHost::new(HostConfig::default()));
        session.host_mut().set_notifications(false);
        session.host_mut().set_notifications(true);
        session.host_mut().remove_frame();
        assert!(!session.status().added);
        assert!(!session.host().config().added);

        // further toggles are ignored once removed
        session.host_mut().set_notifications(true);
        let names: Vec<String> = session.status().events.iter().cloned().collect();
        assert_eq!(names.len(), 4);
        assert!(names[1].ends_with("notificationsDisabled"));
        assert!(names[2].ends_with("notificationsEnabled"));
        assert!(names[3].ends_with("frameRemoved"));

        session.add_frame();
        assert!(session.status().added);
    }

    #[test]
    fn event_log_is_bounded() {
        let mut session = FrameSession::mount(LocalHost::new(HostConfig::default()));
        for _ in 0..10 {
            session.host_mut().click_primary_button();
        }
        let status = session.status();
        assert_eq!(status.events.len(), EVENT_LOG_LEN);
        assert!(status.events.iter().all(|e| e.ends_with("primaryButtonClicked")));
    }

    #[test]
    fn local_host_drops_listeners_on_unmount() {
        let mut host = LocalHost::new(HostConfig::default());
        host.on(FrameEventKind::FrameRemoved, Box::new(|_| {}));
        host.remove_all_listeners();
        assert_eq!(host.listener_count(), 0);
    }
}
