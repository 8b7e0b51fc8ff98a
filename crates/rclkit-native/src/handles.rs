// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native handle structs and option blocks.
//!
//! Each entity exists first in a zero-initialized form: object-shaped, safe
//! to pass to any entry point, but not registered with a runtime. Init entry
//! points fill the private `impl_` part; fini entry points clear it again.

use std::ffi::{CStr, CString};
use std::fmt;
use std::num::NonZeroU64;
use std::time::Duration;

/// Identifier assigned by a runtime to a registered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(NonZeroU64);

impl EntityId {
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Identifier for the `seq`-th allocation of a runtime (0-based).
    #[must_use]
    pub fn from_sequence(seq: u64) -> Self {
        Self(NonZeroU64::MIN.saturating_add(seq))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Size of a publisher gid in bytes.
pub const GID_SIZE: usize = 16;

/// Globally unique publisher identifier carried in [`MessageInfo`].
pub type Gid = [u8; GID_SIZE];

// ---------------------------------------------------------------------------
// Allocator
// ---------------------------------------------------------------------------

/// Allocation policy handed to init entry points.
///
/// The default allocator is unbounded. A budget caps the bytes a single
/// request may reserve; requests above it fail with `RCL_RET_BAD_ALLOC`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RclAllocator {
    budget: Option<usize>,
}

impl RclAllocator {
    /// Allocator with no budget.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { budget: None }
    }

    /// Allocator that refuses any request larger than `bytes`.
    #[must_use]
    pub const fn with_budget(bytes: usize) -> Self {
        Self {
            budget: Some(bytes),
        }
    }

    #[must_use]
    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    /// Whether a request of `bytes` fits the budget.
    #[must_use]
    pub fn admits(&self, bytes: usize) -> bool {
        self.budget.map_or(true, |limit| bytes <= limit)
    }
}

// ---------------------------------------------------------------------------
// Type support and messages
// ---------------------------------------------------------------------------

/// Opaque message-type descriptor supplied by the message-type system.
///
/// The lifecycle layer passes it through untouched; a runtime only compares
/// it to decide whether two endpoints carry the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeSupport {
    typesupport_identifier: &'static str,
    type_name: &'static str,
}

impl TypeSupport {
    #[must_use]
    pub const fn new(typesupport_identifier: &'static str, type_name: &'static str) -> Self {
        Self {
            typesupport_identifier,
            type_name,
        }
    }

    #[must_use]
    pub fn typesupport_identifier(&self) -> &'static str {
        self.typesupport_identifier
    }

    /// Fully qualified type name, e.g. `std_msgs/msg/String`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Serialized message buffer exchanged with `publish` / `take`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializedMessage {
    pub buffer: Vec<u8>,
}

impl SerializedMessage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Metadata filled in by `take` alongside the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageInfo {
    /// Publish time in nanoseconds since the Unix epoch.
    pub source_timestamp_ns: i64,
    /// Time the sample entered the subscription queue.
    pub received_timestamp_ns: i64,
    pub publication_sequence_number: u64,
    pub publisher_gid: Gid,
    pub from_intra_process: bool,
}

// ---------------------------------------------------------------------------
// QoS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPolicy {
    KeepLast(usize),
    KeepAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityPolicy {
    Reliable,
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityPolicy {
    Volatile,
    /// Late-joining subscriptions receive the retained history.
    TransientLocal,
}

/// Subset of the ROS 2 QoS profile honoured by the runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosProfile {
    pub history: HistoryPolicy,
    pub reliability: ReliabilityPolicy,
    pub durability: DurabilityPolicy,
}

/// Default keep-last depth (matches `rmw_qos_profile_default`).
pub const DEFAULT_QUEUE_DEPTH: usize = 10;

impl Default for QosProfile {
    fn default() -> Self {
        Self {
            history: HistoryPolicy::KeepLast(DEFAULT_QUEUE_DEPTH),
            reliability: ReliabilityPolicy::Reliable,
            durability: DurabilityPolicy::Volatile,
        }
    }
}

impl QosProfile {
    #[must_use]
    pub fn keep_last(depth: usize) -> Self {
        Self {
            history: HistoryPolicy::KeepLast(depth),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn transient_local(mut self) -> Self {
        self.durability = DurabilityPolicy::TransientLocal;
        self
    }

    #[must_use]
    pub fn best_effort(mut self) -> Self {
        self.reliability = ReliabilityPolicy::BestEffort;
        self
    }

    /// Queue bound implied by the history policy (`None` = unbounded).
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        match self.history {
            HistoryPolicy::KeepLast(depth) => Some(depth.max(1)),
            HistoryPolicy::KeepAll => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Init options and context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InitOptionsImpl {
    pub allocator: RclAllocator,
    pub domain_id: usize,
}

/// Native init options (`rcl_init_options_t`).
#[derive(Debug, Clone, Default)]
pub struct RclInitOptions {
    pub impl_: Option<InitOptionsImpl>,
}

impl RclInitOptions {
    #[must_use]
    pub fn zero_initialized() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn allocator(&self) -> Option<RclAllocator> {
        self.impl_.as_ref().map(|inner| inner.allocator)
    }
}

#[derive(Debug, Clone)]
pub struct ContextImpl {
    pub instance_id: u64,
    pub arguments: Vec<CString>,
    pub domain_id: usize,
}

/// Native context (`rcl_context_t`).
#[derive(Debug, Clone, Default)]
pub struct RclContext {
    pub impl_: Option<ContextImpl>,
}

impl RclContext {
    #[must_use]
    pub fn zero_initialized() -> Self {
        Self::default()
    }

    /// Instance identity, `0` while zero-initialized.
    #[must_use]
    pub fn instance_id(&self) -> u64 {
        self.impl_.as_ref().map_or(0, |inner| inner.instance_id)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RclNodeOptions {
    pub allocator: RclAllocator,
    pub use_global_arguments: bool,
    pub enable_rosout: bool,
}

impl Default for RclNodeOptions {
    fn default() -> Self {
        Self {
            allocator: RclAllocator::unbounded(),
            use_global_arguments: true,
            enable_rosout: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeImpl {
    pub id: EntityId,
    pub name: CString,
    pub namespace: CString,
    pub context_instance: u64,
    pub options: RclNodeOptions,
}

/// Native node (`rcl_node_t`).
#[derive(Debug, Clone, Default)]
pub struct RclNode {
    pub impl_: Option<NodeImpl>,
}

impl RclNode {
    #[must_use]
    pub fn zero_initialized() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.impl_.as_ref().map(|inner| inner.id)
    }
}

// ---------------------------------------------------------------------------
// Publisher / subscription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RclPublisherOptions {
    pub qos: QosProfile,
    pub allocator: RclAllocator,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RclSubscriptionOptions {
    pub qos: QosProfile,
    pub allocator: RclAllocator,
}

#[derive(Debug, Clone)]
pub struct EndpointImpl {
    pub id: EntityId,
    pub node: EntityId,
    pub topic_name: CString,
    pub type_support: TypeSupport,
    pub qos: QosProfile,
}

/// Native publisher (`rcl_publisher_t`).
#[derive(Debug, Clone, Default)]
pub struct RclPublisher {
    pub impl_: Option<EndpointImpl>,
}

impl RclPublisher {
    #[must_use]
    pub fn zero_initialized() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.impl_.as_ref().map(|inner| inner.id)
    }

    #[must_use]
    pub fn topic_name(&self) -> Option<&CStr> {
        self.impl_.as_ref().map(|inner| inner.topic_name.as_c_str())
    }
}

/// Native subscription (`rcl_subscription_t`).
#[derive(Debug, Clone, Default)]
pub struct RclSubscription {
    pub impl_: Option<EndpointImpl>,
}

impl RclSubscription {
    #[must_use]
    pub fn zero_initialized() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.impl_.as_ref().map(|inner| inner.id)
    }

    #[must_use]
    pub fn topic_name(&self) -> Option<&CStr> {
        self.impl_.as_ref().map(|inner| inner.topic_name.as_c_str())
    }
}

// ---------------------------------------------------------------------------
// Wait set
// ---------------------------------------------------------------------------

/// Declared slot capacity per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitSetCapacity {
    pub subscriptions: usize,
    pub guard_conditions: usize,
    pub timers: usize,
    pub clients: usize,
    pub services: usize,
}

impl WaitSetCapacity {
    #[must_use]
    pub fn subscriptions(count: usize) -> Self {
        Self {
            subscriptions: count,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.subscriptions + self.guard_conditions + self.timers + self.clients + self.services
    }
}

#[derive(Debug, Clone)]
pub struct WaitSetImpl {
    pub id: EntityId,
    pub capacity: WaitSetCapacity,
    pub allocator: RclAllocator,
    pub subscription_index: usize,
}

/// Native wait set (`rcl_wait_set_t`).
///
/// `subscriptions` is the public slot table: after a wait, a slot still
/// holding its entity id is ready, a `None` slot is not.
#[derive(Debug, Clone, Default)]
pub struct RclWaitSet {
    pub subscriptions: Vec<Option<EntityId>>,
    pub size_of_subscriptions: usize,
    pub impl_: Option<WaitSetImpl>,
}

impl RclWaitSet {
    #[must_use]
    pub fn zero_initialized() -> Self {
        Self::default()
    }

    /// Number of subscriptions registered since the last clear.
    #[must_use]
    pub fn registered_subscriptions(&self) -> usize {
        self.impl_
            .as_ref()
            .map_or(0, |inner| inner.subscription_index)
    }
}

/// Convert a typed timeout to the native wait convention.
///
/// `None` waits forever (`0`), `Some(Duration::ZERO)` polls once (`-1`),
/// anything else is a bound in nanoseconds (saturating).
#[must_use]
pub fn timeout_to_ns(timeout: Option<Duration>) -> i64 {
    match timeout {
        None => 0,
        Some(d) if d.is_zero() => -1,
        Some(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
    }
}
