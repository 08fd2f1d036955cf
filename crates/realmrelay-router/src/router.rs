//! The relay router: session events in, effects out.
//!
//! ```text
//!   game session                                   chat channel
//!   ────────────                                   ────────────
//!   Chat / Translation ──→ ┌─────────────┐ ──→ Notify
//!   PresenceAdd/Remove ──→ │ RelayRouter │ ──→ Command / Kick  ──→ game
//!                          │             │ ──→ Record          ──→ history
//!   gateway message    ──→ └─────────────┘ ──→ Command (relayed chat)
//! ```
//!
//! The router owns the presence registry and the spam guard for one
//! connection generation. A full reset (manual leave or give-up) starts a
//! fresh generation; transient reconnects keep the current one.

use std::sync::Arc;
use std::time::Instant;

use realmrelay_protocol::{
    ChannelId, GameCommand, GatewayMessage, Notification, ParticipantId,
    PresenceRecord, SessionEvent, Severity, sanitize_line,
};
use realmrelay_session::{JoinOutcome, ParticipantSession, PresenceRegistry, SpamGuard};

use crate::{Effect, HistoryRecord, HistoryEvent, ModerationLists, RouterConfig, Verdict};

/// Translates session events and gateway messages into [`Effect`]s.
///
/// Every method is synchronous and infallible. The engine calls them from
/// its single processing task, so no two handlers ever interleave.
pub struct RelayRouter {
    presence: PresenceRegistry,
    spam: SpamGuard,
    lists: Arc<ModerationLists>,
    config: RouterConfig,
    generation: u64,
}

impl RelayRouter {
    /// Creates a router for generation 0.
    pub fn new(config: RouterConfig, lists: Arc<ModerationLists>) -> Self {
        Self {
            presence: PresenceRegistry::new(config.presence.clone()),
            spam: SpamGuard::new(),
            lists,
            config,
            generation: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Session events
    // -----------------------------------------------------------------------

    /// Handles one event from the game session.
    ///
    /// `now` timestamps joins for the rapid-rejoin check. `Ended` and
    /// `Error` produce nothing here; the connection lifecycle is the
    /// engine's business.
    pub fn handle_event(&mut self, event: SessionEvent, now: Instant) -> Vec<Effect> {
        match event {
            SessionEvent::Chat { source_name, text } => self.on_chat(&source_name, &text),
            SessionEvent::Translation { text } => self.on_translation(text),
            SessionEvent::PresenceAdd { records } => {
                let mut effects = Vec::new();
                for record in records {
                    self.on_presence_add(record, now, &mut effects);
                }
                effects
            }
            SessionEvent::PresenceRemove { ids } => {
                let mut effects = Vec::new();
                for id in ids {
                    self.on_presence_remove(&id, &mut effects);
                }
                effects
            }
            SessionEvent::Ended | SessionEvent::Error { .. } => Vec::new(),
        }
    }

    fn on_chat(&mut self, source_name: &str, text: &str) -> Vec<Effect> {
        if text.is_empty() {
            return Vec::new();
        }
        if self.config.is_synthetic(text) {
            return self.on_abuse_signal(source_name);
        }

        let mut effects = vec![Effect::Notify(Notification::plain(format!(
            "<{source_name}> {text}"
        )))];
        if self.config.is_leave_command(text) {
            tracing::info!(name = %source_name, "in-game leave command received");
            effects.push(Effect::Leave);
        }
        effects
    }

    fn on_abuse_signal(&mut self, source_name: &str) -> Vec<Effect> {
        let Some((id, name)) = self.attribute(source_name) else {
            tracing::debug!("unattributable abuse signal dropped");
            return Vec::new();
        };

        if !self.spam.flag_once(&id) {
            return Vec::new();
        }

        tracing::warn!(participant_id = %id, %name, "external spam detected");
        vec![Effect::Notify(Notification::titled(
            "Anti Spam",
            format!("Player {name} is sending external spam."),
            Severity::Danger,
        ))]
    }

    /// Resolves who an abuse signal belongs to.
    ///
    /// A named source is matched against present participants first, and
    /// keyed by name if it is not present. With no name, falls back to the
    /// most recently registered participant. That fallback is a guess and
    /// can be wrong when several people join at once.
    fn attribute(&self, source_name: &str) -> Option<(ParticipantId, String)> {
        if !source_name.is_empty() {
            return Some(match self.presence.find_by_name(source_name) {
                Some(session) => (session.id.clone(), session.display_name.clone()),
                None => (ParticipantId::unlisted(source_name), source_name.to_string()),
            });
        }
        self.presence
            .most_recent()
            .map(|session| (session.id.clone(), session.display_name.clone()))
    }

    fn on_translation(&self, text: String) -> Vec<Effect> {
        if !text.contains(self.config.death_marker.as_str()) {
            tracing::debug!("translation event ignored");
            return Vec::new();
        }
        vec![Effect::Notify(Notification::titled(
            "Death Message",
            text,
            Severity::Danger,
        ))]
    }

    fn on_presence_add(&mut self, record: PresenceRecord, now: Instant, effects: &mut Vec<Effect>) {
        let device = self.config.device_table.classify(record.platform);
        let name = record.name;
        let id = record.id;

        match self.presence.on_join(id.clone(), name.as_str(), device, now) {
            JoinOutcome::DuplicateIgnored => return,
            JoinOutcome::RapidRejoin { since_previous } => {
                tracing::warn!(
                    participant_id = %id,
                    %name,
                    since_previous_ms = since_previous.as_millis() as u64,
                    "rapid rejoin"
                );
                effects.push(Effect::Notify(Notification::titled(
                    "Rapid Connection Alert",
                    format!("Rapid connect/disconnect detected!\nUsername: {name}, ID: {id}"),
                    Severity::Warning,
                )));
            }
            JoinOutcome::Created => {}
        }

        effects.push(Effect::Notify(Notification::titled(
            "Player Joined",
            format!("Player {name} joined the realm!\nDevice: {device}"),
            Severity::Success,
        )));
        effects.push(Effect::Record(HistoryRecord {
            event: HistoryEvent::Join,
            name: name.clone(),
            device,
        }));
        if self.config.announce_in_game {
            effects.push(Effect::Command(GameCommand::JoinAnnouncement {
                name: name.clone(),
                device,
            }));
        }
        if self.config.flag_windows_devices && device.is_windows_family() {
            effects.push(Effect::Notify(Notification::titled(
                "Possible Bot!",
                format!("Player {name} joined on {device}, a desktop client."),
                Severity::Warning,
            )));
        }

        if let Verdict::Kick(reason) = self.lists.evaluate(device, &name) {
            if !self.presence.mark_kick_pending(&id) {
                return;
            }
            tracing::info!(participant_id = %id, %name, %reason, "kicking participant");
            effects.push(Effect::Kick {
                id,
                name: name.clone(),
                reason,
            });
            effects.push(Effect::Notify(Notification::titled(
                "Player Kicked",
                format!(
                    "Player {name} (Device: {device}) has been kicked from the realm.\nReason: {reason}"
                ),
                Severity::Danger,
            )));
        }
    }

    fn on_presence_remove(&mut self, id: &ParticipantId, effects: &mut Vec<Effect>) {
        let Some(session) = self.presence.on_leave(id) else {
            return;
        };

        self.spam.clear(id);
        self.spam.clear(&ParticipantId::unlisted(&session.display_name));

        effects.push(Effect::Notify(Notification::titled(
            "Player Left",
            format!("Player {} left the realm!", session.display_name),
            Severity::Warning,
        )));
        effects.push(Effect::Record(HistoryRecord {
            event: HistoryEvent::Leave,
            name: session.display_name.clone(),
            device: session.device,
        }));
        if self.config.announce_in_game {
            effects.push(Effect::Command(GameCommand::LeaveAnnouncement {
                name: session.display_name,
            }));
        }
    }

    // -----------------------------------------------------------------------
    // Gateway messages
    // -----------------------------------------------------------------------

    /// Handles a message seen on the chat gateway.
    ///
    /// Only messages in the `bound` channel that were not written by a bot
    /// are relayed. When `connected` is `false` the author gets an error
    /// notification instead of a game command.
    pub fn handle_gateway(
        &self,
        message: &GatewayMessage,
        bound: Option<&ChannelId>,
        connected: bool,
    ) -> Vec<Effect> {
        if message.from_bot || bound != Some(&message.channel) {
            return Vec::new();
        }
        let text = sanitize_line(&message.content);
        if text.is_empty() {
            return Vec::new();
        }
        if !connected {
            return vec![Effect::Notify(Notification::titled(
                "Error",
                "The relay is not connected to a realm.",
                Severity::Danger,
            ))];
        }
        vec![Effect::Command(GameCommand::RelayedChat {
            author_tag: message.author_tag.clone(),
            text,
        })]
    }

    // -----------------------------------------------------------------------
    // Lifecycle and queries
    // -----------------------------------------------------------------------

    /// Discards all presence and spam state and starts a new generation.
    pub fn reset(&mut self) {
        self.presence = PresenceRegistry::new(self.config.presence.clone());
        self.spam = SpamGuard::new();
        self.generation += 1;
        tracing::debug!(generation = self.generation, "router state reset");
    }

    /// Present participants in join order.
    pub fn participants(&self) -> Vec<&ParticipantSession> {
        self.presence.list()
    }

    /// Swaps in a new moderation snapshot. Affects future joins only.
    pub fn set_lists(&mut self, lists: Arc<ModerationLists>) {
        self.lists = lists;
    }

    /// The current moderation snapshot.
    pub fn lists(&self) -> &Arc<ModerationLists> {
        &self.lists
    }

    /// How many full resets have happened.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn spam(&self) -> &SpamGuard {
        &self.spam
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use realmrelay_protocol::{Device, KickReason};

    use super::*;

    fn router() -> RelayRouter {
        RelayRouter::new(RouterConfig::default(), Arc::new(ModerationLists::default()))
    }

    fn record(id: &str, name: &str, platform: i32) -> PresenceRecord {
        PresenceRecord {
            id: ParticipantId::new(id),
            name: name.into(),
            platform,
        }
    }

    fn join(id: &str, name: &str, platform: i32) -> SessionEvent {
        SessionEvent::PresenceAdd {
            records: vec![record(id, name, platform)],
        }
    }

    fn chat(source: &str, text: &str) -> SessionEvent {
        SessionEvent::Chat {
            source_name: source.into(),
            text: text.into(),
        }
    }

    fn titles(effects: &[Effect]) -> Vec<Option<&str>> {
        effects
            .iter()
            .filter_map(Effect::as_notification)
            .map(|n| n.title.as_deref())
            .collect()
    }

    #[test]
    fn test_handle_event_chat_relays_with_name() {
        let mut router = router();
        let effects = router.handle_event(chat("Steve", "hi all"), Instant::now());
        assert_eq!(
            effects,
            vec![Effect::Notify(Notification::plain("<Steve> hi all"))]
        );
    }

    #[test]
    fn test_handle_event_empty_chat_ignored() {
        let mut router = router();
        assert!(router.handle_event(chat("Steve", ""), Instant::now()).is_empty());
    }

    #[test]
    fn test_handle_event_leave_keyword_relays_then_leaves() {
        let mut router = router();
        let effects = router.handle_event(chat("Steve", "-leave"), Instant::now());
        assert_eq!(effects.len(), 2);
        assert!(matches!(effects[0], Effect::Notify(_)));
        assert_eq!(effects[1], Effect::Leave);
    }

    #[test]
    fn test_handle_event_translation_with_death_marker_notifies() {
        let mut router = router();
        let effects = router.handle_event(
            SessionEvent::Translation {
                text: "death.attack.fall Steve".into(),
            },
            Instant::now(),
        );
        assert_eq!(titles(&effects), vec![Some("Death Message")]);
        assert_eq!(
            effects[0].as_notification().unwrap().body,
            "death.attack.fall Steve"
        );
    }

    #[test]
    fn test_handle_event_other_translation_ignored() {
        let mut router = router();
        let effects = router.handle_event(
            SessionEvent::Translation {
                text: "multiplayer.player.joined".into(),
            },
            Instant::now(),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn test_handle_event_join_emits_notify_record_announce() {
        let mut router = router();
        let effects = router.handle_event(join("p1", "Steve", 1), Instant::now());
        assert_eq!(
            effects,
            vec![
                Effect::Notify(Notification::titled(
                    "Player Joined",
                    "Player Steve joined the realm!\nDevice: Android",
                    Severity::Success,
                )),
                Effect::Record(HistoryRecord {
                    event: HistoryEvent::Join,
                    name: "Steve".into(),
                    device: Device::Android,
                }),
                Effect::Command(GameCommand::JoinAnnouncement {
                    name: "Steve".into(),
                    device: Device::Android,
                }),
            ]
        );
    }

    #[test]
    fn test_handle_event_announcements_disabled_no_commands() {
        let config = RouterConfig {
            announce_in_game: false,
            ..RouterConfig::default()
        };
        let mut router = RelayRouter::new(config, Arc::default());
        let now = Instant::now();
        let mut effects = router.handle_event(join("p1", "Steve", 1), now);
        effects.extend(router.handle_event(
            SessionEvent::PresenceRemove {
                ids: vec![ParticipantId::new("p1")],
            },
            now,
        ));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Command(_))));
    }

    #[test]
    fn test_handle_event_duplicate_join_silent() {
        let mut router = router();
        let now = Instant::now();
        router.handle_event(join("p1", "Steve", 1), now);
        let effects = router.handle_event(join("p1", "Steve", 1), now);
        assert!(effects.is_empty());
        assert_eq!(router.participants().len(), 1);
    }

    #[test]
    fn test_handle_event_remove_untracked_noop() {
        let mut router = router();
        let effects = router.handle_event(
            SessionEvent::PresenceRemove {
                ids: vec![ParticipantId::new("ghost")],
            },
            Instant::now(),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn test_handle_event_leave_emits_notify_record_announce() {
        let mut router = router();
        let now = Instant::now();
        router.handle_event(join("p1", "Steve", 15), now);
        let effects = router.handle_event(
            SessionEvent::PresenceRemove {
                ids: vec![ParticipantId::new("p1")],
            },
            now,
        );
        assert_eq!(titles(&effects), vec![Some("Player Left")]);
        assert!(effects.contains(&Effect::Record(HistoryRecord {
            event: HistoryEvent::Leave,
            name: "Steve".into(),
            device: Device::Linux,
        })));
        assert!(effects.contains(&Effect::Command(GameCommand::LeaveAnnouncement {
            name: "Steve".into()
        })));
    }

    #[test]
    fn test_handle_event_batch_processed_in_order() {
        let mut router = router();
        let effects = router.handle_event(
            SessionEvent::PresenceAdd {
                records: vec![record("a", "Alex", 1), record("b", "Blake", 2)],
            },
            Instant::now(),
        );
        let bodies: Vec<_> = effects
            .iter()
            .filter_map(Effect::as_notification)
            .map(|n| n.body.as_str())
            .collect();
        assert!(bodies[0].contains("Alex"));
        assert!(bodies[1].contains("Blake"));
        let names: Vec<_> = router
            .participants()
            .iter()
            .map(|s| s.display_name.as_str())
            .collect();
        assert_eq!(names, ["Alex", "Blake"]);
    }

    #[test]
    fn test_handle_event_windows_flag_enabled_warns() {
        let config = RouterConfig {
            flag_windows_devices: true,
            ..RouterConfig::default()
        };
        let mut router = RelayRouter::new(config, Arc::default());
        let effects = router.handle_event(join("p1", "Steve", 7), Instant::now());
        assert!(titles(&effects).contains(&Some("Possible Bot!")));

        let effects = router.handle_event(join("p2", "Alex", 1), Instant::now());
        assert!(!titles(&effects).contains(&Some("Possible Bot!")));
    }

    #[test]
    fn test_handle_event_rejoin_after_kick_kicks_again() {
        let lists = ModerationLists {
            block_list: ["Griefer".to_string()].into(),
            ..ModerationLists::default()
        };
        let mut router = RelayRouter::new(RouterConfig::default(), Arc::new(lists));
        let start = Instant::now();
        router.handle_event(join("p1", "Griefer", 1), start);
        assert!(router.presence().get(&ParticipantId::new("p1")).unwrap().kick_pending);

        router.handle_event(
            SessionEvent::PresenceRemove {
                ids: vec![ParticipantId::new("p1")],
            },
            start,
        );
        let effects = router.handle_event(join("p1", "Griefer", 1), start + Duration::from_secs(60));
        let kicks = effects
            .iter()
            .filter(|e| matches!(e, Effect::Kick { reason: KickReason::BlockedName, .. }))
            .count();
        assert_eq!(kicks, 1);
    }

    #[test]
    fn test_handle_event_unlisted_source_flagged_by_name() {
        let mut router = router();
        let effects = router.handle_event(chat("Spammer", "* External hi"), Instant::now());
        assert_eq!(titles(&effects), vec![Some("Anti Spam")]);
        assert!(router.spam().is_flagged(&ParticipantId::unlisted("Spammer")));
    }

    #[test]
    fn test_handle_event_anonymous_signal_falls_back_to_most_recent() {
        let mut router = router();
        let now = Instant::now();
        router.handle_event(join("a", "Alex", 1), now);
        router.handle_event(join("b", "Blake", 1), now);
        let effects = router.handle_event(chat("", "<External> spam"), now);
        assert!(effects[0].as_notification().unwrap().body.contains("Blake"));
        assert!(router.spam().is_flagged(&ParticipantId::new("b")));
    }

    #[test]
    fn test_handle_event_anonymous_signal_nobody_present_dropped() {
        let mut router = router();
        let effects = router.handle_event(chat("", "* External spam"), Instant::now());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_handle_event_leave_clears_spam_flag() {
        let mut router = router();
        let now = Instant::now();
        router.handle_event(join("p1", "Steve", 1), now);
        router.handle_event(chat("Steve", "* External x"), now);
        assert!(router.spam().is_flagged(&ParticipantId::new("p1")));

        router.handle_event(
            SessionEvent::PresenceRemove {
                ids: vec![ParticipantId::new("p1")],
            },
            now,
        );
        assert!(!router.spam().is_flagged(&ParticipantId::new("p1")));
    }

    #[test]
    fn test_handle_event_ended_produces_nothing() {
        let mut router = router();
        assert!(router.handle_event(SessionEvent::Ended, Instant::now()).is_empty());
        assert!(
            router
                .handle_event(
                    SessionEvent::Error {
                        detail: "boom".into()
                    },
                    Instant::now()
                )
                .is_empty()
        );
    }

    #[test]
    fn test_reset_clears_state_and_bumps_generation() {
        let mut router = router();
        let now = Instant::now();
        router.handle_event(join("p1", "Steve", 1), now);
        router.handle_event(chat("Steve", "* External x"), now);

        router.reset();

        assert_eq!(router.generation(), 1);
        assert!(router.participants().is_empty());
        assert!(!router.spam().is_flagged(&ParticipantId::new("p1")));
        // A rejoin right after a reset is not rapid: the history is gone.
        let effects = router.handle_event(join("p1", "Steve", 1), now);
        assert!(!titles(&effects).contains(&Some("Rapid Connection Alert")));
    }

    #[test]
    fn test_set_lists_applies_to_later_joins() {
        let mut router = router();
        let now = Instant::now();
        let before = router.handle_event(join("p1", "Griefer", 1), now);
        assert!(!before.iter().any(|e| matches!(e, Effect::Kick { .. })));

        router.set_lists(Arc::new(ModerationLists {
            block_list: ["Griefer".to_string()].into(),
            ..ModerationLists::default()
        }));
        let after = router.handle_event(join("p2", "Griefer", 1), now);
        assert!(after.iter().any(|e| matches!(e, Effect::Kick { .. })));
    }

    // -- gateway -------------------------------------------------------------

    fn gateway(channel: &str, from_bot: bool, content: &str) -> GatewayMessage {
        GatewayMessage {
            channel: ChannelId::new(channel),
            author_tag: "alex#0001".into(),
            from_bot,
            content: content.into(),
        }
    }

    #[test]
    fn test_handle_gateway_bound_channel_relays() {
        let router = router();
        let bound = ChannelId::new("relay");
        let effects = router.handle_gateway(&gateway("relay", false, "hello"), Some(&bound), true);
        assert_eq!(
            effects,
            vec![Effect::Command(GameCommand::RelayedChat {
                author_tag: "alex#0001".into(),
                text: "hello".into(),
            })]
        );
    }

    #[test]
    fn test_handle_gateway_other_channel_ignored() {
        let router = router();
        let bound = ChannelId::new("relay");
        assert!(
            router
                .handle_gateway(&gateway("general", false, "hello"), Some(&bound), true)
                .is_empty()
        );
        assert!(
            router
                .handle_gateway(&gateway("relay", false, "hello"), None, true)
                .is_empty()
        );
    }

    #[test]
    fn test_handle_gateway_bot_author_ignored() {
        let router = router();
        let bound = ChannelId::new("relay");
        assert!(
            router
                .handle_gateway(&gateway("relay", true, "echo"), Some(&bound), true)
                .is_empty()
        );
    }

    #[test]
    fn test_handle_gateway_control_only_content_ignored() {
        let router = router();
        let bound = ChannelId::new("relay");
        for content in ["", "   ", "\n\r\t", "\u{7}\u{1b}"] {
            assert!(
                router
                    .handle_gateway(&gateway("relay", false, content), Some(&bound), true)
                    .is_empty(),
                "{content:?} should not be relayed"
            );
        }
    }

    #[test]
    fn test_handle_gateway_multiline_content_collapsed() {
        let router = router();
        let bound = ChannelId::new("relay");
        let effects =
            router.handle_gateway(&gateway("relay", false, "hi\nthere"), Some(&bound), true);
        assert_eq!(
            effects,
            vec![Effect::Command(GameCommand::RelayedChat {
                author_tag: "alex#0001".into(),
                text: "hi there".into(),
            })]
        );
    }

    #[test]
    fn test_handle_gateway_disconnected_reports_error() {
        let router = router();
        let bound = ChannelId::new("relay");
        let effects = router.handle_gateway(&gateway("relay", false, "hello"), Some(&bound), false);
        assert_eq!(titles(&effects), vec![Some("Error")]);
    }
}
