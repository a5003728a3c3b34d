//! Error Poller
//!
//! Drains the controller error channel one message per tick, stamps each
//! message with a process-wide id and local time, and broadcasts it.

use chrono::Local;
use cnc_bridge_shared::ErrorEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::StatusCache;
use crate::link::{ControlLink, ErrorChannel};
use crate::observer::ObserverRegistry;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ErrorPoller {
    link: Arc<dyn ControlLink>,
    cache: Arc<StatusCache>,
    observers: Arc<ObserverRegistry>,
    /// Opened lazily, dropped on any failure
    channel: Mutex<Option<Box<dyn ErrorChannel>>>,
    next_id: AtomicU64,
}

impl ErrorPoller {
    pub fn new(
        link: Arc<dyn ControlLink>,
        cache: Arc<StatusCache>,
        observers: Arc<ObserverRegistry>,
    ) -> Self {
        Self {
            link,
            cache,
            observers,
            channel: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run one tick. Does nothing while the controller is down.
    pub async fn poll_errors(&self) -> Option<ErrorEvent> {
        if !self.cache.is_alive().await {
            return None;
        }

        let mut channel = self.channel.lock().await;
        if channel.is_none() {
            match self.link.open_error_channel().await {
                Ok(opened) => *channel = Some(opened),
                Err(e) => {
                    debug!("[ERRORS] Cannot open error channel: {}", e);
                    return None;
                }
            }
        }

        let polled = match channel.as_mut() {
            Some(open) => open.poll().await,
            None => return None,
        };

        let message = match polled {
            Ok(Some(message)) => message,
            Ok(None) => return None,
            Err(e) => {
                warn!("[ERRORS] Error channel failed, reopening: {}", e);
                *channel = None;
                return None;
            }
        };
        drop(channel);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let time = Local::now().format(TIME_FORMAT).to_string();
        let event = ErrorEvent::new(id, message.kind, message.text, time);

        self.observers.notify_errors(&event);
        Some(event)
    }

    /// Drop the current channel handle; the next tick opens a fresh one
    pub async fn reset_channel(&self) {
        *self.channel.lock().await = None;
    }
}
