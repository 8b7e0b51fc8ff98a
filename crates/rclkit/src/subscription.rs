// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed input endpoint.
//!
//! A subscription has two notions of validity: its handle state, and
//! [`Subscription::is_valid`], which asks the runtime whether the entity is
//! currently operable. A zero-initialized subscription is object-shaped but
//! not valid.

use crate::error::{Error, Result, ReturnCode};
use crate::handle::{EntityKind, Handle, HandleState};
use crate::msg::Message;
use crate::node::Node;
use parking_lot::{Mutex, MutexGuard};
use rclkit_native::{
    EntityId, MessageInfo, QosProfile, RclAllocator, RclSubscription, RclSubscriptionOptions,
    SerializedMessage,
};
use std::ffi::CString;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// `None` uses keep-last with the runtime's configured depth.
    pub qos: Option<QosProfile>,
    /// `None` uses the runtime's default allocator.
    pub allocator: Option<RclAllocator>,
}

impl SubscriptionOptions {
    #[must_use]
    pub fn with_qos(qos: QosProfile) -> Self {
        Self {
            qos: Some(qos),
            allocator: None,
        }
    }
}

pub struct Subscription<'a, T: Message> {
    node: &'a Node<'a>,
    handle: Mutex<Handle<RclSubscription>>,
    _message: PhantomData<fn() -> T>,
}

impl<T: Message> std::fmt::Debug for Subscription<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("state", &self.state())
            .field("topic", &self.topic_name().ok())
            .field("type", &T::type_support().type_name())
            .finish()
    }
}

impl<'a, T: Message> Subscription<'a, T> {
    #[must_use]
    pub fn zero_initialized(node: &'a Node<'a>) -> Self {
        Self {
            node,
            handle: Mutex::new(Handle::new(EntityKind::Subscription)),
            _message: PhantomData,
        }
    }

    pub fn new(node: &'a Node<'a>, topic: &str) -> Result<Self> {
        Self::with_options(node, topic, &SubscriptionOptions::default())
    }

    pub fn with_options(
        node: &'a Node<'a>,
        topic: &str,
        options: &SubscriptionOptions,
    ) -> Result<Self> {
        let subscription = Self::zero_initialized(node);
        subscription.initialize(topic, options)?;
        Ok(subscription)
    }

    /// Create the endpoint on the runtime. Requires a valid node.
    pub fn initialize(&self, topic: &str, options: &SubscriptionOptions) -> Result<()> {
        if topic.is_empty() {
            return Err(Error::invalid_argument("topic name must not be empty"));
        }
        let c_topic = CString::new(topic)?;
        let rt = self.node.context().runtime();
        let native_options = RclSubscriptionOptions {
            qos: options
                .qos
                .unwrap_or_else(|| QosProfile::keep_last(rt.config().queue_depth)),
            allocator: options
                .allocator
                .unwrap_or_else(|| rt.default_allocator()),
        };
        let type_support = T::type_support();

        self.handle.lock().initialize(|native| {
            self.node.with_native(|node| {
                rt.invoke("rcl_subscription_init", |api| {
                    api.subscription_init(native, node, &type_support, &c_topic, &native_options)
                })?;
                self.node.endpoints().acquire();
                Ok(())
            })
        })?;
        log::debug!(
            "[rclkit] subscription on '{}' [{}]",
            topic,
            type_support.type_name()
        );
        Ok(())
    }

    /// Take one pending message without blocking.
    ///
    /// `Ok(None)` means nothing is pending; errors mean the subscription or
    /// the payload is broken.
    pub fn take(&self) -> Result<Option<(T, MessageInfo)>> {
        let rt = self.node.context().runtime();
        let mut payload = SerializedMessage::new();
        let mut info = MessageInfo::default();
        let code = self.handle.lock().with_valid(|native| {
            rt.invoke_with(
                "rcl_take",
                |api| api.take(native, &mut payload, &mut info),
                &[ReturnCode::SubscriptionTakeFailed],
            )
        })?;
        if code == ReturnCode::SubscriptionTakeFailed {
            return Ok(None);
        }
        let message = T::deserialize(&payload.buffer).map_err(|err| Error::Rcl {
            code: ReturnCode::Error,
            message: format!("failed to deserialize {}: {}", T::type_support().type_name(), err),
        })?;
        Ok(Some((message, info)))
    }

    /// Expanded topic name.
    pub fn topic_name(&self) -> Result<String> {
        self.handle.lock().with_valid(|native| {
            native
                .topic_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| Error::invalid_argument("subscription has no topic"))
        })
    }

    /// Release the endpoint. Idempotent.
    pub fn destroy(&self) -> Result<()> {
        let rt = self.node.context().runtime();
        self.handle.lock().finalize(
            |native| {
                self.node.with_native_any(|node| {
                    rt.invoke("rcl_subscription_fini", |api| api.subscription_fini(native, node))
                })
            },
            || self.node.endpoints().release(),
        )
    }

    /// Whether the runtime considers the subscription operable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let handle = self.handle.lock();
        handle.state() == HandleState::Valid
            && self
                .node
                .context()
                .runtime()
                .api()
                .subscription_is_valid(handle.native())
    }

    #[must_use]
    pub fn state(&self) -> HandleState {
        self.handle.lock().state()
    }

    #[must_use]
    pub fn node(&self) -> &'a Node<'a> {
        self.node
    }
}

/// Type-erased view used by wait sets.
pub(crate) trait SubscriptionEntity: Sync {
    fn native(&self) -> MutexGuard<'_, Handle<RclSubscription>>;

    fn entity_id(&self) -> Option<EntityId> {
        self.native().native().id()
    }
}

impl<T: Message> SubscriptionEntity for Subscription<'_, T> {
    fn native(&self) -> MutexGuard<'_, Handle<RclSubscription>> {
        self.handle.lock()
    }
}

impl<T: Message> Drop for Subscription<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            log::warn!("[rclkit] subscription destroy on drop failed: {}", err);
        }
    }
}
