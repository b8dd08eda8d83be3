//! Pending requests, push listeners and the command name map.
//!
//! All three are owned by one session and only mutated through it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use crate::error::Result;
use crate::identifiers::{CommandId, TargetId};

// ============================================================================
// Types
// ============================================================================

/// Callback invoked with a decoded response or push message.
pub type ResponseCallback<P> = Box<dyn FnMut(CommandId, &P) -> Result<()>>;

// ============================================================================
// PendingRequest
// ============================================================================

/// A buffered or sent message awaiting its response.
pub(crate) struct PendingRequest<P> {
    /// Payload, kept for re-sending on the next open.
    pub payload: P,
    /// Command the response arrives under.
    pub command: CommandId,
    /// Logical message name.
    pub name: String,
    /// `None` for a buffered plain send.
    pub listener: Option<ResponseCallback<P>>,
}

impl<P> PendingRequest<P> {
    #[inline]
    pub fn is_awaiting(&self) -> bool {
        self.listener.is_some()
    }
}

impl<P> fmt::Debug for PendingRequest<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("command", &self.command)
            .field("name", &self.name)
            .field("awaiting", &self.is_awaiting())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PendingQueue
// ============================================================================

/// Pending requests in submission order.
pub(crate) struct PendingQueue<P> {
    entries: Vec<PendingRequest<P>>,
}

impl<P> Default for PendingQueue<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<P> PendingQueue<P> {
    pub fn push(&mut self, request: PendingRequest<P>) {
        self.entries.push(request);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_command(&self, command: CommandId) -> bool {
        self.entries.iter().any(|entry| entry.command == command)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingRequest<P>> {
        self.entries.iter()
    }

    /// Drops buffered plain sends, keeping requests that await a response.
    ///
    /// Returns the number of entries dropped.
    pub fn retain_awaiting(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(PendingRequest::is_awaiting);
        before - self.entries.len()
    }

    /// Removes and returns the oldest entry for `command`.
    pub fn take_response(&mut self, command: CommandId) -> Option<PendingRequest<P>> {
        let index = self.entries.iter().position(|entry| entry.command == command)?;
        Some(self.entries.remove(index))
    }

    /// Removes every entry for `command`. Returns how many were removed.
    pub fn remove_command(&mut self, command: CommandId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.command != command);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Push listeners keyed by `(command, target)`.
///
/// Listeners of one command run in registration order.
pub(crate) struct ListenerRegistry<P> {
    by_command: FxHashMap<CommandId, Vec<(TargetId, ResponseCallback<P>)>>,
}

impl<P> Default for ListenerRegistry<P> {
    fn default() -> Self {
        Self {
            by_command: FxHashMap::default(),
        }
    }
}

impl<P> ListenerRegistry<P> {
    /// Inserts a listener, replacing the one registered for the same target.
    ///
    /// Returns `true` if an existing listener was replaced.
    pub fn upsert(
        &mut self,
        command: CommandId,
        target: TargetId,
        callback: ResponseCallback<P>,
    ) -> bool {
        let listeners = self.by_command.entry(command).or_default();
        if let Some(slot) = listeners.iter_mut().find(|(t, _)| *t == target) {
            slot.1 = callback;
            return true;
        }
        listeners.push((target, callback));
        false
    }

    /// Removes the listener of `target` for `command`.
    pub fn remove(&mut self, command: CommandId, target: TargetId) -> bool {
        let Some(listeners) = self.by_command.get_mut(&command) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(t, _)| *t != target);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.by_command.remove(&command);
        }
        removed
    }

    /// Removes every listener of `command`. Returns how many were removed.
    pub fn clear_command(&mut self, command: CommandId) -> usize {
        self.by_command
            .remove(&command)
            .map_or(0, |listeners| listeners.len())
    }

    pub fn clear(&mut self) {
        self.by_command.clear();
    }

    pub fn count(&self, command: CommandId) -> usize {
        self.by_command.get(&command).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.by_command.values().map(Vec::len).sum()
    }

    /// Invokes every listener of `command`.
    ///
    /// A failing listener is logged and does not stop the others. Returns
    /// the number of listeners invoked.
    pub fn dispatch(&mut self, command: CommandId, payload: &P) -> usize {
        let Some(listeners) = self.by_command.get_mut(&command) else {
            return 0;
        };

        for (target, callback) in listeners.iter_mut() {
            if let Err(e) = callback(command, payload) {
                warn!(%command, %target, error = %e, "Push listener failed");
            }
        }

        trace!(%command, count = listeners.len(), "Push dispatched");
        listeners.len()
    }
}

// ============================================================================
// CommandNameMap
// ============================================================================

/// Command id to the message name its inbound payload decodes as.
#[derive(Debug, Default)]
pub(crate) struct CommandNameMap {
    names: FxHashMap<CommandId, String>,
}

impl CommandNameMap {
    pub fn insert(&mut self, command: CommandId, name: String) {
        self.names.insert(command, name);
    }

    pub fn get(&self, command: CommandId) -> Option<&str> {
        self.names.get(&command).map(String::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::error::Error;

    fn noop() -> ResponseCallback<u32> {
        Box::new(|_, _| Ok(()))
    }

    fn pending(command: u32, awaiting: bool) -> PendingRequest<u32> {
        PendingRequest {
            payload: command,
            command: CommandId::new(command),
            name: format!("Cmd{command}"),
            listener: awaiting.then(noop),
        }
    }

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> ResponseCallback<u32> {
        let log = Rc::clone(log);
        Box::new(move |_, _| {
            log.borrow_mut().push(tag);
            Ok(())
        })
    }

    #[test]
    fn test_retain_awaiting_drops_plain_sends() {
        let mut queue = PendingQueue::default();
        queue.push(pending(1, false));
        queue.push(pending(2, true));
        queue.push(pending(3, false));

        assert_eq!(queue.retain_awaiting(), 2);
        assert_eq!(queue.len(), 1);
        assert!(queue.contains_command(CommandId::new(2)));
    }

    #[test]
    fn test_take_response_is_fifo() {
        let mut queue = PendingQueue::default();
        let mut first = pending(7, true);
        first.name = "first".to_string();
        queue.push(first);
        queue.push(pending(7, true));

        let taken = queue.take_response(CommandId::new(7)).unwrap();
        assert_eq!(taken.name, "first");
        assert_eq!(queue.len(), 1);
        assert!(queue.take_response(CommandId::new(8)).is_none());
    }

    #[test]
    fn test_remove_command() {
        let mut queue = PendingQueue::default();
        queue.push(pending(1, true));
        queue.push(pending(1, false));
        queue.push(pending(2, true));

        assert_eq!(queue.remove_command(CommandId::new(1)), 2);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_upsert_replaces_same_target() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        let command = CommandId::new(2001);

        assert!(!registry.upsert(command, TargetId::new(1), recorder(&log, "old")));
        assert!(registry.upsert(command, TargetId::new(1), recorder(&log, "new")));
        assert_eq!(registry.count(command), 1);

        registry.dispatch(command, &0);
        assert_eq!(*log.borrow(), vec!["new"]);
    }

    #[test]
    fn test_dispatch_survives_failing_listener() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        let command = CommandId::new(2001);

        registry.upsert(command, TargetId::new(1), recorder(&log, "a"));
        registry.upsert(
            command,
            TargetId::new(2),
            Box::new(|_, _| Err(Error::callback("boom"))),
        );
        registry.upsert(command, TargetId::new(3), recorder(&log, "c"));

        assert_eq!(registry.dispatch(command, &0), 3);
        assert_eq!(*log.borrow(), vec!["a", "c"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut registry: ListenerRegistry<u32> = ListenerRegistry::default();
        let a = CommandId::new(1);
        let b = CommandId::new(2);
        registry.upsert(a, TargetId::new(1), Box::new(|_, _| Ok(())));
        registry.upsert(a, TargetId::new(2), Box::new(|_, _| Ok(())));
        registry.upsert(b, TargetId::new(1), Box::new(|_, _| Ok(())));

        assert!(registry.remove(a, TargetId::new(1)));
        assert!(!registry.remove(a, TargetId::new(1)));
        assert_eq!(registry.total(), 2);

        assert_eq!(registry.clear_command(a), 1);
        assert_eq!(registry.count(a), 0);

        registry.clear();
        assert_eq!(registry.total(), 0);
    }

    #[test]
    fn test_command_name_map() {
        let mut names = CommandNameMap::default();
        names.insert(CommandId::new(1), "PingResp".to_string());
        assert_eq!(names.get(CommandId::new(1)), Some("PingResp"));
        assert_eq!(names.get(CommandId::new(2)), None);
    }
}
