//! Channel registry — named topics and their member sets.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// Maps channel name to its member set.
///
/// A channel exists exactly while it has members: the first join creates it,
/// the last leave deletes it. The member count is the set's length, so it
/// can never disagree with the membership.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, HashSet<Uuid>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` to `channel`, creating the channel on first join.
    ///
    /// Returns `true` only when the member was newly added; re-joining an
    /// existing member changes nothing.
    pub fn join(&mut self, channel: &str, id: Uuid) -> bool {
        self.channels
            .entry(channel.to_owned())
            .or_default()
            .insert(id)
    }

    /// Remove `id` from `channel`, deleting the channel when it empties.
    ///
    /// Returns `true` only when the member was actually removed.
    pub fn leave(&mut self, channel: &str, id: Uuid) -> bool {
        let Some(members) = self.channels.get_mut(channel) else {
            return false;
        };
        if !members.remove(&id) {
            return false;
        }
        if members.is_empty() {
            let _ = self.channels.remove(channel);
        }
        true
    }

    /// Members of `channel`, if it exists.
    pub fn members(&self, channel: &str) -> Option<&HashSet<Uuid>> {
        self.channels.get(channel)
    }

    /// Member count of `channel` (0 for unknown channels).
    pub fn member_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, HashSet::len)
    }

    /// Whether `channel` currently exists.
    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// Number of live channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel currently exists.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_join_creates_channel() {
        let mut reg = ChannelRegistry::new();
        let a = Uuid::new_v4();
        assert!(reg.join("room1", a));
        assert!(reg.contains("room1"));
        assert_eq!(reg.member_count("room1"), 1);
    }

    #[test]
    fn two_members_count_two() {
        let mut reg = ChannelRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(reg.join("room1", a));
        assert!(reg.join("room1", b));
        assert_eq!(reg.member_count("room1"), 2);
    }

    #[test]
    fn rejoin_does_not_double_count() {
        let mut reg = ChannelRegistry::new();
        let a = Uuid::new_v4();
        assert!(reg.join("room1", a));
        assert!(!reg.join("room1", a));
        assert_eq!(reg.member_count("room1"), 1);
    }

    #[test]
    fn leave_decrements_and_keeps_others() {
        let mut reg = ChannelRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let _ = reg.join("room1", a);
        let _ = reg.join("room1", b);
        assert!(reg.leave("room1", a));
        assert_eq!(reg.member_count("room1"), 1);
        assert!(reg.members("room1").unwrap().contains(&b));
    }

    #[test]
    fn last_leave_deletes_channel() {
        let mut reg = ChannelRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let _ = reg.join("room1", a);
        let _ = reg.join("room1", b);
        let _ = reg.leave("room1", a);
        let _ = reg.leave("room1", b);
        assert!(!reg.contains("room1"));
        assert!(reg.is_empty());
    }

    #[test]
    fn leave_unknown_channel_is_noop() {
        let mut reg = ChannelRegistry::new();
        assert!(!reg.leave("nope", Uuid::new_v4()));
    }

    #[test]
    fn leave_non_member_is_noop() {
        let mut reg = ChannelRegistry::new();
        let a = Uuid::new_v4();
        let _ = reg.join("room1", a);
        assert!(!reg.leave("room1", Uuid::new_v4()));
        assert_eq!(reg.member_count("room1"), 1);
    }

    #[test]
    fn unknown_channel_counts_zero() {
        let reg = ChannelRegistry::new();
        assert_eq!(reg.member_count("nope"), 0);
        assert!(reg.members("nope").is_none());
    }

    #[test]
    fn channels_are_independent() {
        let mut reg = ChannelRegistry::new();
        let a = Uuid::new_v4();
        let _ = reg.join("x", a);
        let _ = reg.join("y", a);
        assert_eq!(reg.len(), 2);
        let _ = reg.leave("x", a);
        assert!(!reg.contains("x"));
        assert!(reg.contains("y"));
    }
}
