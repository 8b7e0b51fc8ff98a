// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process implementation of the native entry-point table.
//!
//! Messages are routed between endpoints created on the same runtime
//! instance. The runtime enforces a single active context, keeps one pending
//! error message, and implements the wait-set slot protocol: on return from
//! [`RclApi::wait`] every slot that is not ready has been cleared.
//!
//! Locking: all tables live behind one mutex; `publish` and `shutdown`
//! signal `data_ready` after releasing their changes so blocked waiters
//! re-evaluate their slots.

mod state;

use crate::api::RclApi;
use crate::error_state::ErrorSlot;
use crate::handles::{
    ContextImpl, EndpointImpl, EntityId, Gid, InitOptionsImpl, MessageInfo, NodeImpl,
    RclAllocator, RclContext, RclInitOptions, RclNode, RclNodeOptions, RclPublisher,
    RclPublisherOptions, RclSubscription, RclSubscriptionOptions, RclWaitSet, SerializedMessage,
    TypeSupport, WaitSetCapacity, WaitSetImpl, GID_SIZE,
};
use crate::names;
use crate::ret::*;
use crate::set_error;
use parking_lot::{Condvar, Mutex};
use state::{NodeRecord, PublisherRecord, RuntimeState, SubscriptionRecord};
use std::collections::VecDeque;
use std::ffi::{CStr, CString};
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Identifier reported by [`RclApi::identifier`].
pub const INTRA_PROCESS_IDENTIFIER: &str = "rclkit_intra";

static RUNTIME_SEQ: AtomicU64 = AtomicU64::new(1);

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// In-process native runtime.
pub struct IntraProcessRcl {
    runtime_id: u64,
    errors: ErrorSlot,
    state: Mutex<RuntimeState>,
    data_ready: Condvar,
    next_entity: AtomicU64,
    next_instance: AtomicU64,
}

impl Default for IntraProcessRcl {
    fn default() -> Self {
        Self::new()
    }
}

impl IntraProcessRcl {
    #[must_use]
    pub fn new() -> Self {
        let runtime_id = RUNTIME_SEQ.fetch_add(1, Ordering::Relaxed);
        log::debug!("[intra] runtime {} created", runtime_id);
        Self {
            runtime_id,
            errors: ErrorSlot::new(),
            state: Mutex::new(RuntimeState::default()),
            data_ready: Condvar::new(),
            next_entity: AtomicU64::new(0),
            next_instance: AtomicU64::new(1),
        }
    }

    /// Error slot of this runtime (lets wrapping layers record failures).
    #[must_use]
    pub fn error_slot(&self) -> &ErrorSlot {
        &self.errors
    }

    /// Whether a context is currently active on this runtime.
    #[must_use]
    pub fn has_active_context(&self) -> bool {
        self.state.lock().active_context.is_some()
    }

    fn allocate_id(&self) -> EntityId {
        EntityId::from_sequence(self.next_entity.fetch_add(1, Ordering::Relaxed))
    }

    fn gid_for(&self, id: EntityId) -> Gid {
        let mut gid = [0u8; GID_SIZE];
        gid[..8].copy_from_slice(&self.runtime_id.to_le_bytes());
        gid[8..].copy_from_slice(&id.get().to_le_bytes());
        gid
    }

    fn endpoint_preflight(
        &self,
        node: &RclNode,
        topic_name: &CStr,
        allocator: RclAllocator,
        kind: &str,
    ) -> Result<(EntityId, String), RclRet> {
        let Some(node_impl) = node.impl_.as_ref() else {
            set_error!(self.errors, "{} init: node is not initialized", kind);
            return Err(RCL_RET_NODE_INVALID);
        };
        if !self.state.lock().node_is_valid(node_impl.id) {
            set_error!(self.errors, "{} init: node {} is not valid", kind, node_impl.id);
            return Err(RCL_RET_NODE_INVALID);
        }

        let Ok(topic) = topic_name.to_str() else {
            set_error!(self.errors, "{} init: topic name is not valid UTF-8", kind);
            return Err(RCL_RET_TOPIC_NAME_INVALID);
        };
        let (Ok(name), Ok(namespace)) = (node_impl.name.to_str(), node_impl.namespace.to_str())
        else {
            set_error!(self.errors, "{} init: node name is not valid UTF-8", kind);
            return Err(RCL_RET_NODE_INVALID);
        };
        let expanded = match names::expand_topic_name(topic, name, namespace) {
            Ok(expanded) => expanded,
            Err(err) => {
                set_error!(self.errors, "topic name '{}' is invalid: {}", topic, err);
                return Err(RCL_RET_TOPIC_NAME_INVALID);
            }
        };

        if !allocator.admits(size_of::<EndpointImpl>() + expanded.len()) {
            set_error!(self.errors, "{} init: allocation refused by allocator", kind);
            return Err(RCL_RET_BAD_ALLOC);
        }
        Ok((node_impl.id, expanded))
    }
}

impl RclApi for IntraProcessRcl {
    fn identifier(&self) -> &'static str {
        INTRA_PROCESS_IDENTIFIER
    }

    fn get_error_string(&self) -> String {
        self.errors.get_string()
    }

    fn reset_error(&self) {
        self.errors.reset();
    }

    fn take_error_string(&self) -> Option<String> {
        self.errors.take()
    }

    fn get_default_allocator(&self) -> RclAllocator {
        RclAllocator::unbounded()
    }

    fn init_options_init(&self, options: &mut RclInitOptions, allocator: RclAllocator) -> RclRet {
        if options.impl_.is_some() {
            set_error!(self.errors, "init options already initialized");
            return RCL_RET_ALREADY_INIT;
        }
        if !allocator.admits(size_of::<InitOptionsImpl>()) {
            set_error!(self.errors, "failed to allocate init options");
            return RCL_RET_BAD_ALLOC;
        }
        options.impl_ = Some(InitOptionsImpl {
            allocator,
            domain_id: 0,
        });
        RCL_RET_OK
    }

    fn init_options_set_domain_id(&self, options: &mut RclInitOptions, domain_id: usize) -> RclRet {
        let Some(inner) = options.impl_.as_mut() else {
            set_error!(self.errors, "init options not initialized");
            return RCL_RET_INVALID_ARGUMENT;
        };
        inner.domain_id = domain_id;
        RCL_RET_OK
    }

    fn init_options_fini(&self, options: &mut RclInitOptions) -> RclRet {
        if options.impl_.take().is_none() {
            set_error!(self.errors, "init options not initialized");
            return RCL_RET_INVALID_ARGUMENT;
        }
        RCL_RET_OK
    }

    fn init(&self, args: &[CString], options: &RclInitOptions, context: &mut RclContext) -> RclRet {
        if context.impl_.is_some() {
            set_error!(self.errors, "context already initialized");
            return RCL_RET_ALREADY_INIT;
        }
        let Some(options_impl) = options.impl_.as_ref() else {
            set_error!(self.errors, "init options not initialized");
            return RCL_RET_INVALID_ARGUMENT;
        };
        let arg_bytes: usize = args.iter().map(|arg| arg.as_bytes().len()).sum();
        if !options_impl
            .allocator
            .admits(size_of::<ContextImpl>() + arg_bytes)
        {
            set_error!(self.errors, "failed to allocate context");
            return RCL_RET_BAD_ALLOC;
        }

        let mut state = self.state.lock();
        if let Some(active) = state.active_context {
            set_error!(
                self.errors,
                "rcl_init called while context {} is already active",
                active
            );
            return RCL_RET_ALREADY_INIT;
        }

        let instance_id = self.next_instance.fetch_add(1, Ordering::Relaxed);
        state.active_context = Some(instance_id);
        state.valid_contexts.insert(instance_id);
        drop(state);

        context.impl_ = Some(ContextImpl {
            instance_id,
            arguments: args.to_vec(),
            domain_id: options_impl.domain_id,
        });
        log::debug!(
            "[intra] context {} initialized (domain {}, {} args)",
            instance_id,
            options_impl.domain_id,
            args.len()
        );
        RCL_RET_OK
    }

    fn shutdown(&self, context: &mut RclContext) -> RclRet {
        let Some(inner) = context.impl_.as_ref() else {
            set_error!(self.errors, "context is not initialized");
            return RCL_RET_NOT_INIT;
        };
        let mut state = self.state.lock();
        if !state.valid_contexts.remove(&inner.instance_id) {
            set_error!(self.errors, "context {} already shut down", inner.instance_id);
            return RCL_RET_NOT_INIT;
        }
        if state.active_context == Some(inner.instance_id) {
            state.active_context = None;
        }
        drop(state);
        self.data_ready.notify_all();
        log::debug!("[intra] context {} shut down", inner.instance_id);
        RCL_RET_OK
    }

    fn context_fini(&self, context: &mut RclContext) -> RclRet {
        let Some(inner) = context.impl_.as_ref() else {
            return RCL_RET_OK;
        };
        if self.state.lock().valid_contexts.contains(&inner.instance_id) {
            set_error!(
                self.errors,
                "context {} is still valid; shut it down before finalizing",
                inner.instance_id
            );
            return RCL_RET_INVALID_ARGUMENT;
        }
        context.impl_ = None;
        RCL_RET_OK
    }

    fn context_is_valid(&self, context: &RclContext) -> bool {
        context
            .impl_
            .as_ref()
            .is_some_and(|inner| self.state.lock().valid_contexts.contains(&inner.instance_id))
    }

    fn context_get_instance_id(&self, context: &RclContext) -> u64 {
        context.instance_id()
    }

    fn node_get_default_options(&self) -> RclNodeOptions {
        RclNodeOptions::default()
    }

    fn node_init(
        &self,
        node: &mut RclNode,
        name: &CStr,
        namespace: &CStr,
        context: &RclContext,
        options: &RclNodeOptions,
    ) -> RclRet {
        if node.impl_.is_some() {
            set_error!(self.errors, "node already initialized");
            return RCL_RET_ALREADY_INIT;
        }
        let Some(context_impl) = context.impl_.as_ref() else {
            set_error!(self.errors, "context is not initialized");
            return RCL_RET_NOT_INIT;
        };

        let Ok(name_str) = name.to_str() else {
            set_error!(self.errors, "node name is not valid UTF-8");
            return RCL_RET_NODE_INVALID_NAME;
        };
        if let Err(err) = names::validate_node_name(name_str) {
            set_error!(self.errors, "node name '{}' is invalid: {}", name_str, err);
            return RCL_RET_NODE_INVALID_NAME;
        }
        let Ok(namespace_str) = namespace.to_str() else {
            set_error!(self.errors, "node namespace is not valid UTF-8");
            return RCL_RET_NODE_INVALID_NAMESPACE;
        };
        if let Err(err) = names::validate_namespace(namespace_str) {
            set_error!(
                self.errors,
                "node namespace '{}' is invalid: {}",
                namespace_str,
                err
            );
            return RCL_RET_NODE_INVALID_NAMESPACE;
        }
        if !options
            .allocator
            .admits(size_of::<NodeImpl>() + name_str.len() + namespace_str.len())
        {
            set_error!(self.errors, "failed to allocate node");
            return RCL_RET_BAD_ALLOC;
        }

        let mut state = self.state.lock();
        if !state.valid_contexts.contains(&context_impl.instance_id) {
            set_error!(
                self.errors,
                "context {} is not valid",
                context_impl.instance_id
            );
            return RCL_RET_NOT_INIT;
        }
        let id = self.allocate_id();
        state.nodes.insert(
            id,
            NodeRecord {
                context_instance: context_impl.instance_id,
            },
        );
        drop(state);

        node.impl_ = Some(NodeImpl {
            id,
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            context_instance: context_impl.instance_id,
            options: *options,
        });
        log::debug!(
            "[intra] node {} '{}' created in '{}'",
            id,
            name_str,
            namespace_str
        );
        RCL_RET_OK
    }

    fn node_fini(&self, node: &mut RclNode) -> RclRet {
        let Some(inner) = node.impl_.take() else {
            return RCL_RET_OK;
        };
        if self.state.lock().nodes.remove(&inner.id).is_none() {
            set_error!(self.errors, "node {} is not registered", inner.id);
            return RCL_RET_NODE_INVALID;
        }
        RCL_RET_OK
    }

    fn node_is_valid(&self, node: &RclNode) -> bool {
        node.id()
            .is_some_and(|id| self.state.lock().node_is_valid(id))
    }

    fn node_get_name<'a>(&self, node: &'a RclNode) -> Option<&'a CStr> {
        node.impl_.as_ref().map(|inner| inner.name.as_c_str())
    }

    fn node_get_namespace<'a>(&self, node: &'a RclNode) -> Option<&'a CStr> {
        node.impl_.as_ref().map(|inner| inner.namespace.as_c_str())
    }

    fn publisher_get_default_options(&self) -> RclPublisherOptions {
        RclPublisherOptions::default()
    }

    fn publisher_init(
        &self,
        publisher: &mut RclPublisher,
        node: &RclNode,
        type_support: &TypeSupport,
        topic_name: &CStr,
        options: &RclPublisherOptions,
    ) -> RclRet {
        if publisher.impl_.is_some() {
            set_error!(self.errors, "publisher already initialized");
            return RCL_RET_ALREADY_INIT;
        }
        let (node_id, topic) =
            match self.endpoint_preflight(node, topic_name, options.allocator, "publisher") {
                Ok(resolved) => resolved,
                Err(ret) => return ret,
            };
        let Ok(topic_c) = CString::new(topic.clone()) else {
            set_error!(self.errors, "topic name contains a NUL byte");
            return RCL_RET_TOPIC_NAME_INVALID;
        };

        let id = self.allocate_id();
        self.state.lock().publishers.insert(
            id,
            PublisherRecord {
                node: node_id,
                topic: topic.clone(),
                type_support: *type_support,
                qos: options.qos,
                gid: self.gid_for(id),
                sequence: 0,
                retained: VecDeque::new(),
            },
        );
        publisher.impl_ = Some(EndpointImpl {
            id,
            node: node_id,
            topic_name: topic_c,
            type_support: *type_support,
            qos: options.qos,
        });
        log::debug!(
            "[intra] publisher {} on '{}' [{}]",
            id,
            topic,
            type_support.type_name()
        );
        RCL_RET_OK
    }

    fn publisher_fini(&self, publisher: &mut RclPublisher, node: &RclNode) -> RclRet {
        let Some(inner) = publisher.impl_.as_ref() else {
            return RCL_RET_OK;
        };
        let mut state = self.state.lock();
        if node.id() != Some(inner.node) || !state.nodes.contains_key(&inner.node) {
            set_error!(
                self.errors,
                "publisher {} does not belong to a registered node",
                inner.id
            );
            return RCL_RET_NODE_INVALID;
        }
        state.publishers.remove(&inner.id);
        drop(state);
        publisher.impl_ = None;
        RCL_RET_OK
    }

    fn publisher_is_valid(&self, publisher: &RclPublisher) -> bool {
        publisher
            .id()
            .is_some_and(|id| self.state.lock().publisher_is_valid(id))
    }

    fn publish(&self, publisher: &RclPublisher, message: &SerializedMessage) -> RclRet {
        let Some(id) = publisher.id() else {
            set_error!(self.errors, "publisher is not initialized");
            return RCL_RET_PUBLISHER_INVALID;
        };
        let mut state = self.state.lock();
        if !state.publisher_is_valid(id) {
            set_error!(self.errors, "publisher {} is not valid", id);
            return RCL_RET_PUBLISHER_INVALID;
        }
        let delivered = state.deliver(id, &message.buffer, now_ns());
        drop(state);
        if delivered > 0 {
            self.data_ready.notify_all();
        }
        log::trace!(
            "[intra] publisher {} sent {} bytes to {} subscriptions",
            id,
            message.len(),
            delivered
        );
        RCL_RET_OK
    }

    fn subscription_get_default_options(&self) -> RclSubscriptionOptions {
        RclSubscriptionOptions::default()
    }

    fn subscription_init(
        &self,
        subscription: &mut RclSubscription,
        node: &RclNode,
        type_support: &TypeSupport,
        topic_name: &CStr,
        options: &RclSubscriptionOptions,
    ) -> RclRet {
        if subscription.impl_.is_some() {
            set_error!(self.errors, "subscription already initialized");
            return RCL_RET_ALREADY_INIT;
        }
        let (node_id, topic) =
            match self.endpoint_preflight(node, topic_name, options.allocator, "subscription") {
                Ok(resolved) => resolved,
                Err(ret) => return ret,
            };
        let Ok(topic_c) = CString::new(topic.clone()) else {
            set_error!(self.errors, "topic name contains a NUL byte");
            return RCL_RET_TOPIC_NAME_INVALID;
        };

        let id = self.allocate_id();
        let mut state = self.state.lock();
        state.subscriptions.insert(
            id,
            SubscriptionRecord {
                node: node_id,
                topic: topic.clone(),
                type_support: *type_support,
                qos: options.qos,
                queue: VecDeque::new(),
            },
        );
        let replayed = state.replay_history(id);
        drop(state);

        subscription.impl_ = Some(EndpointImpl {
            id,
            node: node_id,
            topic_name: topic_c,
            type_support: *type_support,
            qos: options.qos,
        });
        log::debug!(
            "[intra] subscription {} on '{}' [{}] ({} replayed)",
            id,
            topic,
            type_support.type_name(),
            replayed
        );
        RCL_RET_OK
    }

    fn subscription_fini(&self, subscription: &mut RclSubscription, node: &RclNode) -> RclRet {
        let Some(inner) = subscription.impl_.as_ref() else {
            return RCL_RET_OK;
        };
        let mut state = self.state.lock();
        if node.id() != Some(inner.node) || !state.nodes.contains_key(&inner.node) {
            set_error!(
                self.errors,
                "subscription {} does not belong to a registered node",
                inner.id
            );
            return RCL_RET_NODE_INVALID;
        }
        state.subscriptions.remove(&inner.id);
        drop(state);
        subscription.impl_ = None;
        RCL_RET_OK
    }

    fn subscription_is_valid(&self, subscription: &RclSubscription) -> bool {
        subscription
            .id()
            .is_some_and(|id| self.state.lock().subscription_is_valid(id))
    }

    fn take(
        &self,
        subscription: &RclSubscription,
        message: &mut SerializedMessage,
        info: &mut MessageInfo,
    ) -> RclRet {
        let Some(id) = subscription.id() else {
            set_error!(self.errors, "subscription is not initialized");
            return RCL_RET_SUBSCRIPTION_INVALID;
        };
        let mut state = self.state.lock();
        if !state.subscription_is_valid(id) {
            set_error!(self.errors, "subscription {} is not valid", id);
            return RCL_RET_SUBSCRIPTION_INVALID;
        }
        let Some(sample) = state
            .subscriptions
            .get_mut(&id)
            .and_then(|record| record.queue.pop_front())
        else {
            return RCL_RET_SUBSCRIPTION_TAKE_FAILED;
        };
        drop(state);

        message.buffer = sample.payload;
        *info = sample.info;
        RCL_RET_OK
    }

    fn wait_set_init(
        &self,
        wait_set: &mut RclWaitSet,
        capacity: WaitSetCapacity,
        allocator: RclAllocator,
    ) -> RclRet {
        if wait_set.impl_.is_some() {
            set_error!(self.errors, "wait set already initialized");
            return RCL_RET_ALREADY_INIT;
        }
        let bytes = capacity
            .total()
            .saturating_mul(size_of::<Option<EntityId>>())
            .saturating_add(size_of::<WaitSetImpl>());
        if !allocator.admits(bytes) {
            set_error!(
                self.errors,
                "failed to allocate {} bytes of wait set storage",
                bytes
            );
            return RCL_RET_BAD_ALLOC;
        }

        let id = self.allocate_id();
        self.state.lock().wait_sets.insert(id);
        wait_set.subscriptions = vec![None; capacity.subscriptions];
        wait_set.size_of_subscriptions = capacity.subscriptions;
        wait_set.impl_ = Some(WaitSetImpl {
            id,
            capacity,
            allocator,
            subscription_index: 0,
        });
        RCL_RET_OK
    }

    fn wait_set_fini(&self, wait_set: &mut RclWaitSet) -> RclRet {
        let Some(inner) = wait_set.impl_.take() else {
            return RCL_RET_OK;
        };
        self.state.lock().wait_sets.remove(&inner.id);
        wait_set.subscriptions = Vec::new();
        wait_set.size_of_subscriptions = 0;
        RCL_RET_OK
    }

    fn wait_set_clear(&self, wait_set: &mut RclWaitSet) -> RclRet {
        let Some(inner) = wait_set.impl_.as_mut() else {
            set_error!(self.errors, "wait set is not initialized");
            return RCL_RET_WAIT_SET_INVALID;
        };
        wait_set.subscriptions.iter_mut().for_each(|slot| *slot = None);
        inner.subscription_index = 0;
        RCL_RET_OK
    }

    fn wait_set_add_subscription(
        &self,
        wait_set: &mut RclWaitSet,
        subscription: &RclSubscription,
        index: Option<&mut usize>,
    ) -> RclRet {
        let Some(inner) = wait_set.impl_.as_mut() else {
            set_error!(self.errors, "wait set is not initialized");
            return RCL_RET_WAIT_SET_INVALID;
        };
        let Some(id) = subscription
            .id()
            .filter(|id| self.state.lock().subscription_is_valid(*id))
        else {
            set_error!(self.errors, "subscription is not valid");
            return RCL_RET_SUBSCRIPTION_INVALID;
        };
        let slot = inner.subscription_index;
        if slot >= wait_set.size_of_subscriptions {
            set_error!(
                self.errors,
                "wait set is full ({} subscriptions)",
                wait_set.size_of_subscriptions
            );
            return RCL_RET_WAIT_SET_FULL;
        }
        wait_set.subscriptions[slot] = Some(id);
        inner.subscription_index += 1;
        if let Some(index) = index {
            *index = slot;
        }
        RCL_RET_OK
    }

    fn wait(&self, wait_set: &mut RclWaitSet, timeout_ns: i64) -> RclRet {
        let Some(inner) = wait_set.impl_.as_ref() else {
            set_error!(self.errors, "wait set is not initialized");
            return RCL_RET_WAIT_SET_INVALID;
        };
        if wait_set.subscriptions.iter().all(Option::is_none) {
            set_error!(self.errors, "wait set {} is empty", inner.id);
            return RCL_RET_WAIT_SET_EMPTY;
        }

        let started = Instant::now();
        let deadline = match timeout_ns {
            0 => None,
            t if t < 0 => Some(started),
            t => Some(started + Duration::from_nanos(t.unsigned_abs())),
        };

        let mut state = self.state.lock();
        loop {
            let any_ready = wait_set
                .subscriptions
                .iter()
                .flatten()
                .any(|id| state.subscription_ready(*id));
            if any_ready {
                for slot in wait_set.subscriptions.iter_mut() {
                    if slot.is_some_and(|id| !state.subscription_ready(id)) {
                        *slot = None;
                    }
                }
                return RCL_RET_OK;
            }

            match deadline {
                None => self.data_ready.wait(&mut state),
                Some(deadline) if Instant::now() >= deadline => {
                    wait_set.subscriptions.iter_mut().for_each(|slot| *slot = None);
                    return RCL_RET_TIMEOUT;
                }
                Some(deadline) => {
                    let _ = self.data_ready.wait_until(&mut state, deadline);
                }
            }
        }
    }
}
