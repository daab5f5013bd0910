//! Priority input router: decides which input consumers receive live input.
//!
//! # How priorities work (for beginners)
//!
//! Every registered consumer carries a [`Priority`]:
//!
//! - [`Priority::AlwaysOn`] – debug bindings. Always enabled.
//! - [`Priority::Tier(n)`] – ordinary bindings (gameplay, UI).
//!
//! The router keeps a single *watermark*, `current_priority`. After every
//! registration or unregistration it runs the **enable/disable pass**:
//!
//! ```text
//! enabled  = { AlwaysOn } ∪ { Tier(n) | n == current_priority }
//! disabled = everything else
//! ```
//!
//! Opening a modal menu escalates to a new top tier, which suppresses the
//! gameplay tier underneath without destroying it. Closing the menu
//! (unregistering it) drops the watermark back and gameplay resumes.
//!
//! # Watermark rules
//!
//! - The watermark starts at 0.
//! - `register_at_new_top_priority` raises the watermark by one, except when
//!   no ordinary consumer is registered yet: the first tier is tier 0.
//! - `unregister` recomputes the watermark as the highest remaining ordinary
//!   tier, or resets it to 0 when no ordinary consumer remains.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

pub mod consumer;
pub mod handle;

pub use consumer::{ActionSet, ConsumerKind, InputConsumer};
pub use handle::{ConsumerHandle, HandleAllocator};

/// Priority tag of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Enabled unconditionally.
    AlwaysOn,
    /// Enabled only while the watermark equals this tier.
    Tier(u32),
}

/// Router contract violations.
///
/// These are programming errors. They are returned rather than ignored so the
/// caller's view of routing never silently diverges from the router's.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// The handle is not (or no longer) registered.
    #[error("{0} is not registered with the input router")]
    UnknownHandle(ConsumerHandle),
}

struct Registration {
    consumer: Box<dyn InputConsumer>,
    priority: Priority,
}

/// The priority-based input consumer router.
///
/// Owned explicitly by the session context; there is no global instance.
pub struct PriorityRouter {
    registrations: BTreeMap<ConsumerHandle, Registration>,
    current_priority: u32,
    handles: HandleAllocator,
}

impl PriorityRouter {
    pub fn new() -> Self {
        Self {
            registrations: BTreeMap::new(),
            current_priority: 0,
            handles: HandleAllocator::new(),
        }
    }

    /// Registers `consumer` at the current watermark, or at [`Priority::AlwaysOn`]
    /// for [`ConsumerKind::Debug`].
    ///
    /// Each call takes ownership of a distinct consumer and returns a fresh
    /// handle, so the same registration can never be made twice.
    pub fn register_at_current_priority(
        &mut self,
        kind: ConsumerKind,
        mut consumer: Box<dyn InputConsumer>,
    ) -> ConsumerHandle {
        let priority = if kind.is_always_on() {
            Priority::AlwaysOn
        } else {
            Priority::Tier(self.current_priority)
        };
        let handle = self.handles.allocate();
        debug!(
            "registering {} ({}) at {:?}",
            handle,
            consumer.name(),
            priority
        );
        consumer.enable();
        self.registrations
            .insert(handle, Registration { consumer, priority });
        self.apply_priorities();
        handle
    }

    /// Escalates the watermark to a new top tier, then registers `consumer` there.
    pub fn register_at_new_top_priority(
        &mut self,
        kind: ConsumerKind,
        consumer: Box<dyn InputConsumer>,
    ) -> ConsumerHandle {
        if self.has_tiered_consumers() {
            self.current_priority += 1;
        }
        self.register_at_current_priority(kind, consumer)
    }

    /// Disables and removes a registration, returning its consumer.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnknownHandle`] if `handle` is not registered.
    pub fn unregister(
        &mut self,
        handle: ConsumerHandle,
    ) -> Result<Box<dyn InputConsumer>, RouterError> {
        let mut registration = self
            .registrations
            .remove(&handle)
            .ok_or(RouterError::UnknownHandle(handle))?;
        registration.consumer.disable();

        self.current_priority = self
            .registrations
            .values()
            .filter_map(|r| match r.priority {
                Priority::Tier(n) => Some(n),
                Priority::AlwaysOn => None,
            })
            .max()
            .unwrap_or(0);
        debug!(
            "unregistered {} ({}); watermark now {}",
            handle,
            registration.consumer.name(),
            self.current_priority
        );

        self.apply_priorities();
        Ok(registration.consumer)
    }

    /// Current priority watermark.
    pub fn current_priority(&self) -> u32 {
        self.current_priority
    }

    pub fn priority_of(&self, handle: ConsumerHandle) -> Option<Priority> {
        self.registrations.get(&handle).map(|r| r.priority)
    }

    /// Whether the consumer behind `handle` is currently enabled.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnknownHandle`] if `handle` is not registered.
    pub fn is_enabled(&self, handle: ConsumerHandle) -> Result<bool, RouterError> {
        self.registrations
            .get(&handle)
            .map(|r| r.consumer.is_enabled())
            .ok_or(RouterError::UnknownHandle(handle))
    }

    /// Handles of every enabled consumer, in registration order.
    pub fn enabled_handles(&self) -> Vec<ConsumerHandle> {
        self.registrations
            .iter()
            .filter(|(_, r)| r.consumer.is_enabled())
            .map(|(h, _)| *h)
            .collect()
    }

    pub fn consumer(&self, handle: ConsumerHandle) -> Option<&dyn InputConsumer> {
        self.registrations.get(&handle).map(|r| r.consumer.as_ref())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn has_tiered_consumers(&self) -> bool {
        self.registrations
            .values()
            .any(|r| matches!(r.priority, Priority::Tier(_)))
    }

    /// The enable/disable pass.
    fn apply_priorities(&mut self) {
        let current = self.current_priority;
        for registration in self.registrations.values_mut() {
            let live = match registration.priority {
                Priority::AlwaysOn => true,
                Priority::Tier(n) => n == current,
            };
            if live {
                registration.consumer.enable();
            } else {
                registration.consumer.disable();
            }
        }
    }
}

impl Default for PriorityRouter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn set(name: &str) -> Box<dyn InputConsumer> {
        Box::new(ActionSet::new(name, ["act"]))
    }

    /// Checks enabled == AlwaysOn ∪ Tier(current).
    fn assert_router_invariant(router: &PriorityRouter) {
        for (handle, registration) in &router.registrations {
            let expected = match registration.priority {
                Priority::AlwaysOn => true,
                Priority::Tier(n) => n == router.current_priority,
            };
            assert_eq!(
                registration.consumer.is_enabled(),
                expected,
                "{handle} enabled state must follow its priority"
            );
        }
    }

    #[test]
    fn test_new_router_is_empty_at_priority_zero() {
        let router = PriorityRouter::new();
        assert!(router.is_empty());
        assert_eq!(router.current_priority(), 0);
    }

    #[test]
    fn test_register_at_current_priority_enables_consumer() {
        // Arrange
        let mut router = PriorityRouter::new();

        // Act
        let h = router.register_at_current_priority(ConsumerKind::Gameplay, set("gameplay"));

        // Assert
        assert_eq!(router.is_enabled(h), Ok(true));
        assert_eq!(router.priority_of(h), Some(Priority::Tier(0)));
    }

    #[test]
    fn test_debug_consumer_is_registered_always_on() {
        let mut router = PriorityRouter::new();
        let h = router.register_at_current_priority(ConsumerKind::Debug, set("debug"));
        assert_eq!(router.priority_of(h), Some(Priority::AlwaysOn));
    }

    #[test]
    fn test_new_top_priority_suppresses_lower_tier() {
        // Arrange
        let mut router = PriorityRouter::new();
        let debug = router.register_at_current_priority(ConsumerKind::Debug, set("debug"));
        let gameplay = router.register_at_current_priority(ConsumerKind::Gameplay, set("gameplay"));

        // Act
        let menu = router.register_at_new_top_priority(ConsumerKind::Ui, set("menu"));

        // Assert
        assert_eq!(router.current_priority(), 1);
        assert_eq!(router.is_enabled(debug), Ok(true));
        assert_eq!(router.is_enabled(gameplay), Ok(false));
        assert_eq!(router.is_enabled(menu), Ok(true));
        assert_router_invariant(&router);
    }

    #[test]
    fn test_suppressed_consumer_accepts_nothing() {
        let mut router = PriorityRouter::new();
        let gameplay = router.register_at_current_priority(ConsumerKind::Gameplay, set("gameplay"));
        assert!(router.consumer(gameplay).is_some_and(|c| c.accepts("act")));

        router.register_at_new_top_priority(ConsumerKind::Ui, set("menu"));

        assert!(router.consumer(gameplay).is_some_and(|c| !c.accepts("act")));
    }

    #[test]
    fn test_consumers_sharing_a_tier_are_all_enabled() {
        let mut router = PriorityRouter::new();
        let a = router.register_at_current_priority(ConsumerKind::Gameplay, set("a"));
        let b = router.register_at_current_priority(ConsumerKind::Ui, set("b"));
        assert_eq!(router.enabled_handles(), vec![a, b]);
    }

    #[test]
    fn test_unregister_top_tier_recomputes_watermark() {
        // Arrange – tiers 0, 1, 2 via three escalations, plus a debug set
        let mut router = PriorityRouter::new();
        let debug = router.register_at_current_priority(ConsumerKind::Debug, set("debug"));
        let p0 = router.register_at_new_top_priority(ConsumerKind::Gameplay, set("p0"));
        let p1 = router.register_at_new_top_priority(ConsumerKind::Ui, set("p1"));
        let p2 = router.register_at_new_top_priority(ConsumerKind::Ui, set("p2"));
        assert_eq!(router.priority_of(p0), Some(Priority::Tier(0)));
        assert_eq!(router.priority_of(p2), Some(Priority::Tier(2)));

        // Act
        router.unregister(p2).expect("p2 is registered");

        // Assert
        assert_eq!(router.current_priority(), 1);
        let mut expected = vec![debug, p1];
        expected.sort();
        assert_eq!(router.enabled_handles(), expected);
        assert_router_invariant(&router);
    }

    #[test]
    fn test_unregister_returns_disabled_consumer() {
        let mut router = PriorityRouter::new();
        let h = router.register_at_current_priority(ConsumerKind::Gameplay, set("gameplay"));

        let consumer = router.unregister(h).expect("registered");

        assert!(!consumer.is_enabled());
        assert_eq!(consumer.name(), "gameplay");
    }

    #[test]
    fn test_unregister_last_ordinary_consumer_resets_watermark_to_zero() {
        // Arrange
        let mut router = PriorityRouter::new();
        let debug = router.register_at_current_priority(ConsumerKind::Debug, set("debug"));
        let _p0 = router.register_at_new_top_priority(ConsumerKind::Gameplay, set("p0"));
        let p1 = router.register_at_new_top_priority(ConsumerKind::Ui, set("p1"));
        router.unregister(_p0).unwrap();
        assert_eq!(router.current_priority(), 1);

        // Act
        router.unregister(p1).unwrap();

        // Assert
        assert_eq!(router.current_priority(), 0);
        assert_eq!(router.is_enabled(debug), Ok(true));

        // A new registration starts over at tier 0
        let fresh = router.register_at_new_top_priority(ConsumerKind::Gameplay, set("fresh"));
        assert_eq!(router.priority_of(fresh), Some(Priority::Tier(0)));
    }

    #[test]
    fn test_unregister_unknown_handle_fails_loudly() {
        // Arrange
        let mut router = PriorityRouter::new();
        let h = router.register_at_current_priority(ConsumerKind::Gameplay, set("gameplay"));
        router.unregister(h).unwrap();

        // Act
        let result = router.unregister(h);

        // Assert
        assert!(matches!(result, Err(RouterError::UnknownHandle(x)) if x == h));
        assert_eq!(router.is_enabled(h), Err(RouterError::UnknownHandle(h)));
    }

    #[test]
    fn test_lower_tier_resumes_when_upper_tier_removed() {
        let mut router = PriorityRouter::new();
        let gameplay = router.register_at_current_priority(ConsumerKind::Gameplay, set("gameplay"));
        let menu = router.register_at_new_top_priority(ConsumerKind::Ui, set("menu"));
        assert_eq!(router.is_enabled(gameplay), Ok(false));

        router.unregister(menu).unwrap();

        assert_eq!(router.is_enabled(gameplay), Ok(true));
        assert_router_invariant(&router);
    }

    #[test]
    fn test_invariant_holds_through_mixed_operations() {
        let mut router = PriorityRouter::new();
        let mut live = Vec::new();
        for i in 0..6 {
            let kind = if i % 3 == 0 { ConsumerKind::Debug } else { ConsumerKind::Gameplay };
            let h = if i % 2 == 0 {
                router.register_at_new_top_priority(kind, set("x"))
            } else {
                router.register_at_current_priority(kind, set("y"))
            };
            live.push(h);
            assert_router_invariant(&router);
        }
        for h in live.into_iter().rev().step_by(2) {
            router.unregister(h).unwrap();
            assert_router_invariant(&router);
        }
    }
}
