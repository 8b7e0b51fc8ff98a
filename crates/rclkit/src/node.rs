// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Named, namespaced participant within a context.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::handle::{ChildCount, EntityKind, Handle, HandleState};
use parking_lot::Mutex;
use rclkit_native::{RclAllocator, RclNode, RclNodeOptions};
use std::ffi::{CStr, CString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOptions {
    /// `None` uses the runtime's default allocator.
    pub allocator: Option<RclAllocator>,
    pub use_global_arguments: bool,
    pub enable_rosout: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        let native = RclNodeOptions::default();
        Self {
            allocator: None,
            use_global_arguments: native.use_global_arguments,
            enable_rosout: native.enable_rosout,
        }
    }
}

pub struct Node<'c> {
    context: &'c Context,
    handle: Mutex<Handle<RclNode>>,
    endpoints: ChildCount,
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("state", &self.state())
            .field("name", &self.fully_qualified_name().ok())
            .field("endpoints", &self.endpoints.live())
            .finish()
    }
}

fn owned(text: Option<&CStr>, what: &str) -> Result<String> {
    let text = text.ok_or_else(|| Error::invalid_argument(format!("node has no {}", what)))?;
    Ok(text.to_string_lossy().into_owned())
}

impl<'c> Node<'c> {
    #[must_use]
    pub fn zero_initialized(context: &'c Context) -> Self {
        Self {
            context,
            handle: Mutex::new(Handle::new(EntityKind::Node)),
            endpoints: ChildCount::default(),
        }
    }

    pub fn new(context: &'c Context, name: &str, namespace: &str) -> Result<Self> {
        Self::with_options(context, name, namespace, &NodeOptions::default())
    }

    pub fn with_options(
        context: &'c Context,
        name: &str,
        namespace: &str,
        options: &NodeOptions,
    ) -> Result<Self> {
        let node = Self::zero_initialized(context);
        node.initialize(name, namespace, options)?;
        Ok(node)
    }

    /// Register the node with the runtime.
    ///
    /// Requires a valid context. Malformed names and namespaces are
    /// `InvalidArgument`.
    pub fn initialize(&self, name: &str, namespace: &str, options: &NodeOptions) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid_argument("node name must not be empty"));
        }
        let c_name = CString::new(name)?;
        let c_namespace = CString::new(namespace)?;
        let rt = self.context.runtime();
        let native_options = RclNodeOptions {
            allocator: options
                .allocator
                .unwrap_or_else(|| rt.default_allocator()),
            use_global_arguments: options.use_global_arguments,
            enable_rosout: options.enable_rosout,
        };

        let mut handle = self.handle.lock();
        handle.initialize(|native| {
            // Counted while the context handle is held so a concurrent
            // finalize sees this node.
            self.context.with_native(|context| {
                rt.invoke("rcl_node_init", |api| {
                    api.node_init(native, &c_name, &c_namespace, context, &native_options)
                })?;
                self.context.children().acquire();
                Ok(())
            })
        })?;
        log::debug!("[rclkit] node '{}' created in '{}'", name, namespace);
        Ok(())
    }

    /// Release the node.
    ///
    /// Refuses while publishers or subscriptions created on it are live.
    /// Idempotent once finalized.
    pub fn destroy(&self) -> Result<()> {
        let mut handle = self.handle.lock();
        self.endpoints
            .ensure_none(EntityKind::Node, "publishers or subscriptions")?;
        let rt = self.context.runtime();
        handle.finalize(
            |native| rt.invoke("rcl_node_fini", |api| api.node_fini(native)),
            || self.context.children().release(),
        )
    }

    /// Node name as registered (copied out of the native buffer).
    pub fn name(&self) -> Result<String> {
        let rt = self.context.runtime();
        self.handle
            .lock()
            .with_valid(|native| owned(rt.api().node_get_name(native), "name"))
    }

    /// Node namespace as registered (copied out of the native buffer).
    pub fn namespace(&self) -> Result<String> {
        let rt = self.context.runtime();
        self.handle
            .lock()
            .with_valid(|native| owned(rt.api().node_get_namespace(native), "namespace"))
    }

    pub fn fully_qualified_name(&self) -> Result<String> {
        Ok(rclkit_native::names::fully_qualified_name(
            &self.name()?,
            &self.namespace()?,
        ))
    }

    /// Whether the runtime still considers the node operable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let handle = self.handle.lock();
        handle.state() == HandleState::Valid
            && self.context.runtime().api().node_is_valid(handle.native())
    }

    #[must_use]
    pub fn state(&self) -> HandleState {
        self.handle.lock().state()
    }

    #[must_use]
    pub fn context(&self) -> &'c Context {
        self.context
    }

    /// Publishers and subscriptions currently alive on this node.
    #[must_use]
    pub fn live_endpoints(&self) -> usize {
        self.endpoints.live()
    }

    pub(crate) fn endpoints(&self) -> &ChildCount {
        &self.endpoints
    }

    pub(crate) fn with_native<R>(&self, f: impl FnOnce(&RclNode) -> Result<R>) -> Result<R> {
        self.handle.lock().with_valid(f)
    }

    /// Native node regardless of state; endpoint teardown only needs its id.
    pub(crate) fn with_native_any<R>(&self, f: impl FnOnce(&RclNode) -> R) -> R {
        f(self.handle.lock().native())
    }
}

impl Drop for Node<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            log::warn!("[rclkit] node destroy on drop failed: {}", err);
        }
    }
}
