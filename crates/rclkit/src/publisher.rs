// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed output endpoint.

use crate::error::{Error, Result};
use crate::handle::{EntityKind, Handle, HandleState};
use crate::msg::Message;
use crate::node::Node;
use parking_lot::Mutex;
use rclkit_native::{QosProfile, RclAllocator, RclPublisher, RclPublisherOptions, SerializedMessage};
use std::ffi::CString;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherOptions {
    /// `None` uses keep-last with the runtime's configured depth.
    pub qos: Option<QosProfile>,
    /// `None` uses the runtime's default allocator.
    pub allocator: Option<RclAllocator>,
}

impl PublisherOptions {
    #[must_use]
    pub fn with_qos(qos: QosProfile) -> Self {
        Self {
            qos: Some(qos),
            allocator: None,
        }
    }
}

pub struct Publisher<'a, T: Message> {
    node: &'a Node<'a>,
    handle: Mutex<Handle<RclPublisher>>,
    _message: PhantomData<fn(&T)>,
}

impl<T: Message> std::fmt::Debug for Publisher<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("state", &self.state())
            .field("topic", &self.topic_name().ok())
            .field("type", &T::type_support().type_name())
            .finish()
    }
}

impl<'a, T: Message> Publisher<'a, T> {
    #[must_use]
    pub fn zero_initialized(node: &'a Node<'a>) -> Self {
        Self {
            node,
            handle: Mutex::new(Handle::new(EntityKind::Publisher)),
            _message: PhantomData,
        }
    }

    pub fn new(node: &'a Node<'a>, topic: &str) -> Result<Self> {
        Self::with_options(node, topic, &PublisherOptions::default())
    }

    pub fn with_options(node: &'a Node<'a>, topic: &str, options: &PublisherOptions) -> Result<Self> {
        let publisher = Self::zero_initialized(node);
        publisher.initialize(topic, options)?;
        Ok(publisher)
    }

    /// Create the endpoint on the runtime. Requires a valid node.
    pub fn initialize(&self, topic: &str, options: &PublisherOptions) -> Result<()> {
        if topic.is_empty() {
            return Err(Error::invalid_argument("topic name must not be empty"));
        }
        let c_topic = CString::new(topic)?;
        let rt = self.node.context().runtime();
        let native_options = RclPublisherOptions {
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
                rt.invoke("rcl_publisher_init", |api| {
                    api.publisher_init(native, node, &type_support, &c_topic, &native_options)
                })?;
                self.node.endpoints().acquire();
                Ok(())
            })
        })?;
        log::debug!(
            "[rclkit] publisher on '{}' [{}]",
            topic,
            type_support.type_name()
        );
        Ok(())
    }

    /// Hand one message to the runtime. Does not block.
    pub fn publish(&self, message: &T) -> Result<()> {
        let payload = SerializedMessage::from_bytes(message.serialize());
        let rt = self.node.context().runtime();
        self.handle
            .lock()
            .with_valid(|native| rt.invoke("rcl_publish", |api| api.publish(native, &payload)))
    }

    /// Expanded topic name.
    pub fn topic_name(&self) -> Result<String> {
        self.handle.lock().with_valid(|native| {
            native
                .topic_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| Error::invalid_argument("publisher has no topic"))
        })
    }

    /// Release the endpoint. Idempotent.
    pub fn destroy(&self) -> Result<()> {
        let rt = self.node.context().runtime();
        self.handle.lock().finalize(
            |native| {
                self.node.with_native_any(|node| {
                    rt.invoke("rcl_publisher_fini", |api| api.publisher_fini(native, node))
                })
            },
            || self.node.endpoints().release(),
        )
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        let handle = self.handle.lock();
        handle.state() == HandleState::Valid
            && self
                .node
                .context()
                .runtime()
                .api()
                .publisher_is_valid(handle.native())
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

impl<T: Message> Drop for Publisher<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            log::warn!("[rclkit] publisher destroy on drop failed: {}", err);
        }
    }
}
