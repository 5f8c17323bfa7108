use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::events::Event;
use crate::types::UserId;

/// message handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: UserId,
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl Notification {
    /// notification for `event`, or `None` when nobody is addressed
    pub fn from_event(event: &Event) -> Option<Self> {
        let recipient_id = event.recipient()?;
        let payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        Some(Self {
            recipient_id,
            event_type: event.event_type().to_string(),
            payload,
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("notification dispatch failed: {message}")]
pub struct DispatchError {
    pub message: String,
}

impl DispatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, recipient_id: UserId, notification: &Notification) -> Result<(), DispatchError>;
}

/// drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatcher;

impl NotificationDispatcher for NoopDispatcher {
    fn notify(&self, _recipient_id: UserId, _notification: &Notification) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, recipient_id: UserId) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| n.recipient_id == recipient_id)
            .collect()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn notify(&self, _recipient_id: UserId, notification: &Notification) -> Result<(), DispatchError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| DispatchError::new("recording dispatcher lock poisoned"))?;
        sent.push(notification.clone());
        Ok(())
    }
}

/// send a notification for every addressed event; failures are logged and dropped
pub fn dispatch_events(dispatcher: &dyn NotificationDispatcher, events: &[Event]) {
    for notification in events.iter().filter_map(Notification::from_event) {
        match dispatcher.notify(notification.recipient_id, &notification) {
            Ok(()) => debug!(
                recipient_id = %notification.recipient_id,
                event_type = %notification.event_type,
                "notification dispatched"
            ),
            Err(e) => warn!(
                recipient_id = %notification.recipient_id,
                event_type = %notification.event_type,
                error = %e,
                "notification dispatch failed"
            ),
        }
    }
}
