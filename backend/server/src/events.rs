//! # Live Updates
//!
//! One broadcast channel per prompt, created on first subscribe.
//!
//! - Publishers never block, a subscriber that falls behind skips to the newest messages
//! - A subscription ends when its SSE connection drops the receiver
//! - Channels without receivers are pruned on the next subscribe or publish
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use axum::response::sse::Event;
use deck::{Comment, PromptStats};
use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::debug;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    Stats(Option<PromptStats>),
    Comments(Vec<Comment>),
}

impl PromptEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PromptEvent::Stats(_) => "stats",
            PromptEvent::Comments(_) => "comments",
        }
    }

    pub fn into_sse(self) -> Result<Event, axum::Error> {
        let event = Event::default().event(self.name());

        match self {
            PromptEvent::Stats(stats) => event.json_data(stats),
            PromptEvent::Comments(comments) => event.json_data(comments),
        }
    }
}

#[derive(Default)]
pub struct EventHub {
    channels: Mutex<HashMap<String, Sender<PromptEvent>>>,
}

impl EventHub {
    fn channels(&self) -> MutexGuard<'_, HashMap<String, Sender<PromptEvent>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, prompt_id: &str) -> Receiver<PromptEvent> {
        let mut channels = self.channels();
        channels.retain(|_, sender| sender.receiver_count() > 0);

        channels
            .entry(prompt_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, prompt_id: &str, event: PromptEvent) -> usize {
        let mut channels = self.channels();

        let Some(sender) = channels.get(prompt_id) else {
            return 0;
        };

        match sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No subscribers left for {prompt_id}, dropping channel");
                channels.remove(prompt_id);
                0
            }
        }
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels().len()
    }
}
