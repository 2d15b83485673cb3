use crate::commentary::prompt_text;
use crate::r#match::engine::MatchEvent;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Default per-subscriber buffer depth.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// One record on a live match stream. Serialized as a newline-delimited
/// JSON record for the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub game_id: u32,
    #[serde(flatten)]
    pub event: MatchEvent,
    pub commentary: String,
}

impl LiveEvent {
    pub fn new(game_id: u32, event: MatchEvent) -> Self {
        LiveEvent {
            game_id,
            commentary: prompt_text(event.commentary_id).to_string(),
            event,
        }
    }

    pub fn tick(&self) -> u32 {
        self.event.tick
    }

    /// One line of the wire format.
    pub fn to_wire_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_default();
        line.push('\n');
        line
    }
}

struct Subscriber {
    tx: Sender<LiveEvent>,
}

/// In-process fan-out of live match events, subscribed by game id.
///
/// Every subscriber sees every event in order through a bounded channel.
/// A subscriber that stops draining is disconnected rather than ever
/// blocking the simulation.
pub struct EventBus {
    buffer: usize,
    subscribers: Mutex<HashMap<u32, Vec<Subscriber>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        EventBus {
            buffer,
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, game_id: u32) -> Receiver<LiveEvent> {
        let (tx, rx) = bounded(self.buffer);

        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers
            .entry(game_id)
            .or_default()
            .push(Subscriber { tx });

        rx
    }

    /// Deliver one event to every live subscriber of the game. Full or
    /// disconnected subscribers are dropped on the spot.
    pub fn publish(&self, game_id: u32, event: &MatchEvent) {
        let live_event = LiveEvent::new(game_id, event.clone());

        let mut subscribers = self.subscribers.lock().unwrap();
        let Some(subs) = subscribers.get_mut(&game_id) else {
            return;
        };

        subs.retain(|sub| match sub.tx.try_send(live_event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("dropping slow subscriber on game {}", game_id);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Tear down the channel once the match completes. Receivers observe
    /// the stream end after draining their buffer.
    pub fn close(&self, game_id: u32) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.remove(&game_id);
    }

    pub fn subscriber_count(&self, game_id: u32) -> usize {
        let subscribers = self.subscribers.lock().unwrap();
        subscribers.get(&game_id).map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r#match::engine::MatchEventKind;

    fn event(tick: u32) -> MatchEvent {
        MatchEvent {
            tick,
            team_id: Some(1),
            kind: MatchEventKind::Run { yards: 5 },
            actors: vec![101],
            commentary_id: 0,
        }
    }

    #[test]
    fn subscribers_receive_events_in_order() {
        let bus = EventBus::default();
        let rx = bus.subscribe(7);

        for tick in 0..10 {
            bus.publish(7, &event(tick));
        }

        for tick in 0..10 {
            assert_eq!(tick, rx.recv().unwrap().tick());
        }
    }

    #[test]
    fn publishing_to_other_games_is_invisible() {
        let bus = EventBus::default();
        let rx = bus.subscribe(7);

        bus.publish(8, &event(1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn slow_subscribers_are_dropped_not_blocked() {
        let bus = EventBus::new(4);
        let _rx = bus.subscribe(7);

        // Five events into a buffer of four: the fifth drops the subscriber
        // instead of blocking.
        for tick in 0..5 {
            bus.publish(7, &event(tick));
        }

        assert_eq!(0, bus.subscriber_count(7));
    }

    #[test]
    fn close_ends_the_stream() {
        let bus = EventBus::default();
        let rx = bus.subscribe(7);

        bus.publish(7, &event(1));
        bus.close(7);

        assert_eq!(1, rx.recv().unwrap().tick());
        assert!(rx.recv().is_err());
    }

    #[test]
    fn wire_lines_are_newline_terminated_json() {
        let live = LiveEvent::new(7, event(3));
        let line = live.to_wire_line();

        assert!(line.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(7, parsed["game_id"].as_u64().unwrap());
        assert_eq!(3, parsed["tick"].as_u64().unwrap());
    }
}
