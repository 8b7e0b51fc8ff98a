// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native entry-point table.
//!
//! One method per native function the lifecycle layer calls. Signatures
//! mirror the C API: handles are passed by reference, status comes back as
//! an [`RclRet`], failure details are left in the runtime's error slot.
//! How an implementation was located (linked, loaded, in-process) is not
//! visible through this trait.

use crate::handles::{
    MessageInfo, RclAllocator, RclContext, RclInitOptions, RclNode, RclNodeOptions, RclPublisher,
    RclPublisherOptions, RclSubscription, RclSubscriptionOptions, RclWaitSet, SerializedMessage,
    TypeSupport, WaitSetCapacity,
};
use crate::ret::RclRet;
use std::ffi::{CStr, CString};

pub trait RclApi: Send + Sync {
    /// Short backend identifier used in logs.
    fn identifier(&self) -> &'static str;

    // --- error state ---

    /// Pending error formatted for display, or `"error not set"`.
    fn get_error_string(&self) -> String;
    fn reset_error(&self);
    /// Read and clear the pending error under a single lock.
    fn take_error_string(&self) -> Option<String>;

    fn get_default_allocator(&self) -> RclAllocator;

    // --- init options / context ---

    fn init_options_init(&self, options: &mut RclInitOptions, allocator: RclAllocator) -> RclRet;
    fn init_options_set_domain_id(&self, options: &mut RclInitOptions, domain_id: usize)
        -> RclRet;
    fn init_options_fini(&self, options: &mut RclInitOptions) -> RclRet;

    fn init(&self, args: &[CString], options: &RclInitOptions, context: &mut RclContext)
        -> RclRet;
    fn shutdown(&self, context: &mut RclContext) -> RclRet;
    fn context_fini(&self, context: &mut RclContext) -> RclRet;
    fn context_is_valid(&self, context: &RclContext) -> bool;
    fn context_get_instance_id(&self, context: &RclContext) -> u64;

    // --- node ---

    fn node_get_default_options(&self) -> RclNodeOptions;
    fn node_init(
        &self,
        node: &mut RclNode,
        name: &CStr,
        namespace: &CStr,
        context: &RclContext,
        options: &RclNodeOptions,
    ) -> RclRet;
    fn node_fini(&self, node: &mut RclNode) -> RclRet;
    fn node_is_valid(&self, node: &RclNode) -> bool;
    fn node_get_name<'a>(&self, node: &'a RclNode) -> Option<&'a CStr>;
    fn node_get_namespace<'a>(&self, node: &'a RclNode) -> Option<&'a CStr>;

    // --- publisher ---

    fn publisher_get_default_options(&self) -> RclPublisherOptions;
    fn publisher_init(
        &self,
        publisher: &mut RclPublisher,
        node: &RclNode,
        type_support: &TypeSupport,
        topic_name: &CStr,
        options: &RclPublisherOptions,
    ) -> RclRet;
    fn publisher_fini(&self, publisher: &mut RclPublisher, node: &RclNode) -> RclRet;
    fn publisher_is_valid(&self, publisher: &RclPublisher) -> bool;
    fn publish(&self, publisher: &RclPublisher, message: &SerializedMessage) -> RclRet;

    // --- subscription ---

    fn subscription_get_default_options(&self) -> RclSubscriptionOptions;
    fn subscription_init(
        &self,
        subscription: &mut RclSubscription,
        node: &RclNode,
        type_support: &TypeSupport,
        topic_name: &CStr,
        options: &RclSubscriptionOptions,
    ) -> RclRet;
    fn subscription_fini(&self, subscription: &mut RclSubscription, node: &RclNode) -> RclRet;
    fn subscription_is_valid(&self, subscription: &RclSubscription) -> bool;
    /// Non-blocking. `RCL_RET_SUBSCRIPTION_TAKE_FAILED` means nothing was pending.
    fn take(
        &self,
        subscription: &RclSubscription,
        message: &mut SerializedMessage,
        info: &mut MessageInfo,
    ) -> RclRet;

    // --- wait set ---

    fn wait_set_init(
        &self,
        wait_set: &mut RclWaitSet,
        capacity: WaitSetCapacity,
        allocator: RclAllocator,
    ) -> RclRet;
    fn wait_set_fini(&self, wait_set: &mut RclWaitSet) -> RclRet;
    fn wait_set_clear(&self, wait_set: &mut RclWaitSet) -> RclRet;
    /// Register `subscription`; the assigned slot is written to `index`.
    fn wait_set_add_subscription(
        &self,
        wait_set: &mut RclWaitSet,
        subscription: &RclSubscription,
        index: Option<&mut usize>,
    ) -> RclRet;
    /// Block until a registered entity is ready or the timeout elapses.
    ///
    /// `timeout_ns == 0` waits forever, a negative value polls once, a
    /// positive value bounds the wait. Non-ready slots are cleared on return.
    fn wait(&self, wait_set: &mut RclWaitSet, timeout_ns: i64) -> RclRet;
}
