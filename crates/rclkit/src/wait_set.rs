// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multiplexed readiness poll over subscriptions.
//!
//! A wait set is a fixed-capacity slot table. Registration stores a
//! non-owning reference; after [`WaitSet::wait`] returns, a slot that still
//! holds its subscription is ready and a cleared slot is not. The recorded
//! membership survives the wait, so [`WaitSet::rearm`] restores the table
//! for the next cycle without reallocating.
//!
//! Waiting on two wait sets that share a subscription from different
//! threads is not supported: both may report the same sample as ready and
//! only one `take` will get it. A wait also holds the wait set's own lock
//! until it returns, so other calls on the same wait set from another
//! thread block behind it.

use crate::context::Context;
use crate::error::{Error, Result, ReturnCode};
use crate::handle::{EntityKind, Handle, HandleState};
use crate::msg::Message;
use crate::subscription::{Subscription, SubscriptionEntity};
use crate::util::{ready_slots, slot_of};
use parking_lot::Mutex;
use rclkit_native::{timeout_to_ns, RclAllocator, RclWaitSet, WaitSetCapacity};
use std::time::Duration;

/// How long [`WaitSet::wait`] may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTimeout {
    /// Block until something is ready.
    Forever,
    /// Check once and return.
    Poll,
    After(Duration),
}

impl WaitTimeout {
    /// Native encoding: `0` forever, negative poll, positive nanoseconds.
    #[must_use]
    pub fn as_native(self) -> i64 {
        match self {
            WaitTimeout::Forever => timeout_to_ns(None),
            WaitTimeout::Poll => timeout_to_ns(Some(Duration::ZERO)),
            WaitTimeout::After(d) => timeout_to_ns(Some(d)),
        }
    }
}

impl From<Duration> for WaitTimeout {
    fn from(d: Duration) -> Self {
        WaitTimeout::After(d)
    }
}

impl From<Option<Duration>> for WaitTimeout {
    fn from(d: Option<Duration>) -> Self {
        d.map_or(WaitTimeout::Forever, WaitTimeout::After)
    }
}

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Ready,
    TimedOut,
}

impl WaitStatus {
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == WaitStatus::Ready
    }
}

pub struct WaitSet<'s> {
    context: &'s Context,
    handle: Mutex<Handle<RclWaitSet>>,
    members: Mutex<Vec<&'s dyn SubscriptionEntity>>,
}

impl std::fmt::Debug for WaitSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitSet")
            .field("state", &self.state())
            .field("capacity", &self.capacity())
            .field("registered", &self.registered())
            .finish()
    }
}

impl<'s> WaitSet<'s> {
    #[must_use]
    pub fn zero_initialized(context: &'s Context) -> Self {
        Self {
            context,
            handle: Mutex::new(Handle::new(EntityKind::WaitSet)),
            members: Mutex::new(Vec::new()),
        }
    }

    /// Wait set with the given capacities, allocated through `allocator`.
    pub fn new(context: &'s Context, capacity: WaitSetCapacity, allocator: RclAllocator) -> Result<Self> {
        let wait_set = Self::zero_initialized(context);
        wait_set.initialize(capacity, allocator)?;
        Ok(wait_set)
    }

    /// Wait set for `count` subscriptions using the runtime's default allocator.
    pub fn for_subscriptions(context: &'s Context, count: usize) -> Result<Self> {
        let allocator = context.runtime().default_allocator();
        Self::new(context, WaitSetCapacity::subscriptions(count), allocator)
    }

    pub fn initialize(&self, capacity: WaitSetCapacity, allocator: RclAllocator) -> Result<()> {
        let rt = self.context.runtime();
        self.handle.lock().initialize(|native| {
            self.context.with_native(|_| {
                rt.invoke("rcl_wait_set_init", |api| {
                    api.wait_set_init(native, capacity, allocator)
                })?;
                self.context.children().acquire();
                Ok(())
            })
        })?;
        Ok(())
    }

    /// Drop all registrations, keeping the slot storage.
    pub fn clear(&self) -> Result<()> {
        let rt = self.context.runtime();
        self.handle
            .lock()
            .with_valid_mut(|native| rt.invoke("rcl_wait_set_clear", |api| api.wait_set_clear(native)))?;
        self.members.lock().clear();
        Ok(())
    }

    /// Register `subscription` and return its slot.
    ///
    /// The subscription must be valid and a slot must be free.
    pub fn add_subscription<T: Message>(&self, subscription: &'s Subscription<'_, T>) -> Result<usize> {
        let slot = self.register(subscription)?;
        self.members.lock().push(subscription);
        Ok(slot)
    }

    fn register(&self, subscription: &dyn SubscriptionEntity) -> Result<usize> {
        let rt = self.context.runtime();
        let mut slot = 0usize;
        self.handle.lock().with_valid_mut(|native| {
            let member = subscription.native();
            rt.invoke("rcl_wait_set_add_subscription", |api| {
                api.wait_set_add_subscription(native, member.native(), Some(&mut slot))
            })
        })?;
        Ok(slot)
    }

    /// Block until a registered subscription is ready or `timeout` elapses.
    ///
    /// `TimedOut` is a normal outcome. Inspect the slots afterwards to learn
    /// which subscriptions are ready.
    ///
    /// The wait set's own lock is held for the whole call, so `is_ready`,
    /// `ready_slots`, `capacity`, `destroy` and `Debug` on this wait set
    /// from another thread block until the wait returns. With
    /// [`WaitTimeout::Forever`] that is the next publish or shutdown.
    ///
    /// An empty slot table is rejected here, before the native wait runs,
    /// so the unlocked native call never has a message to leave in the
    /// shared error slot.
    pub fn wait(&self, timeout: impl Into<WaitTimeout>) -> Result<WaitStatus> {
        let timeout_ns = timeout.into().as_native();
        let rt = self.context.runtime();
        let code = self.handle.lock().with_valid_mut(|native| {
            if ready_slots(&native.subscriptions).is_empty() {
                return Err(Error::invalid_argument(
                    "wait set has no registered subscriptions; rearm or add one first",
                ));
            }
            rt.invoke_blocking(
                "rcl_wait",
                |api| api.wait(native, timeout_ns),
                &[ReturnCode::Timeout],
            )
        })?;
        Ok(match code {
            ReturnCode::Timeout => WaitStatus::TimedOut,
            _ => WaitStatus::Ready,
        })
    }

    /// Clear and re-register the recorded membership.
    pub fn rearm(&self) -> Result<()> {
        let rt = self.context.runtime();
        self.handle
            .lock()
            .with_valid_mut(|native| rt.invoke("rcl_wait_set_clear", |api| api.wait_set_clear(native)))?;
        let members = self.members.lock();
        for member in members.iter() {
            self.register(*member)?;
        }
        Ok(())
    }

    /// Whether `slot` still holds its subscription after the last wait.
    #[must_use]
    pub fn is_ready(&self, slot: usize) -> bool {
        let handle = self.handle.lock();
        handle.state() == HandleState::Valid
            && handle
                .native()
                .subscriptions
                .get(slot)
                .is_some_and(Option::is_some)
    }

    /// Slots that are ready after the last wait.
    #[must_use]
    pub fn ready_slots(&self) -> Vec<usize> {
        let handle = self.handle.lock();
        if handle.state() != HandleState::Valid {
            return Vec::new();
        }
        ready_slots(&handle.native().subscriptions)
    }

    #[must_use]
    pub fn is_subscription_ready<T: Message>(&self, subscription: &Subscription<'_, T>) -> bool {
        let Some(id) = subscription.entity_id() else {
            return false;
        };
        let handle = self.handle.lock();
        handle.state() == HandleState::Valid
            && slot_of(&handle.native().subscriptions, id).is_some()
    }

    /// Declared subscription capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.handle.lock().native().size_of_subscriptions
    }

    /// Subscriptions registered since the last clear.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.handle.lock().native().registered_subscriptions()
    }

    /// Release the slot storage. Registered subscriptions are untouched.
    pub fn destroy(&self) -> Result<()> {
        let rt = self.context.runtime();
        let result = self.handle.lock().finalize(
            |native| rt.invoke("rcl_wait_set_fini", |api| api.wait_set_fini(native)),
            || self.context.children().release(),
        );
        self.members.lock().clear();
        result
    }

    #[must_use]
    pub fn state(&self) -> HandleState {
        self.handle.lock().state()
    }

    #[must_use]
    pub fn context(&self) -> &'s Context {
        self.context
    }
}

impl Drop for WaitSet<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            log::warn!("[rclkit] wait set destroy on drop failed: {}", err);
        }
    }
}
