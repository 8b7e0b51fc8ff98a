// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Failure paths driven through a wrapping runtime that forces selected
// native calls to fail.

use rclkit::msg;
use rclkit::{
    Context, EnvConfig, Error, ErrorKind, HandleState, Node, Publisher, Runtime, Subscription,
    Teardown, WaitSet, WaitTimeout,
};
use rclkit_native::ret::{RCL_RET_ERROR, RCL_RET_PUBLISHER_INVALID};
use rclkit_native::{
    IntraProcessRcl, MessageInfo, RclAllocator, RclApi, RclContext, RclInitOptions, RclNode,
    RclNodeOptions, RclPublisher, RclPublisherOptions, RclRet, RclSubscription,
    RclSubscriptionOptions, RclWaitSet, SerializedMessage, TypeSupport, WaitSetCapacity,
};
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Faults {
    publisher_fini: AtomicBool,
    publish: AtomicBool,
    /// Keep a failing publish inside its native call until released.
    hold_publish: AtomicBool,
    publish_entered: AtomicBool,
    release_publish: AtomicBool,
}

fn spin_until(flag: &AtomicBool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !flag.load(Ordering::SeqCst) {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::yield_now();
    }
    true
}

struct FaultyRcl {
    inner: IntraProcessRcl,
    faults: Arc<Faults>,
}

impl FaultyRcl {
    fn fail(&self, message: &str) -> RclRet {
        self.inner.error_slot().set(message, file!(), line!());
        RCL_RET_ERROR
    }
}

impl RclApi for FaultyRcl {
    fn identifier(&self) -> &'static str {
        "faulty"
    }
    fn get_error_string(&self) -> String {
        self.inner.get_error_string()
    }
    fn reset_error(&self) {
        self.inner.reset_error();
    }
    fn take_error_string(&self) -> Option<String> {
        self.inner.take_error_string()
    }
    fn get_default_allocator(&self) -> RclAllocator {
        self.inner.get_default_allocator()
    }
    fn init_options_init(&self, options: &mut RclInitOptions, allocator: RclAllocator) -> RclRet {
        self.inner.init_options_init(options, allocator)
    }
    fn init_options_set_domain_id(&self, options: &mut RclInitOptions, domain_id: usize) -> RclRet {
        self.inner.init_options_set_domain_id(options, domain_id)
    }
    fn init_options_fini(&self, options: &mut RclInitOptions) -> RclRet {
        self.inner.init_options_fini(options)
    }
    fn init(&self, args: &[CString], options: &RclInitOptions, context: &mut RclContext) -> RclRet {
        self.inner.init(args, options, context)
    }
    fn shutdown(&self, context: &mut RclContext) -> RclRet {
        self.inner.shutdown(context)
    }
    fn context_fini(&self, context: &mut RclContext) -> RclRet {
        self.inner.context_fini(context)
    }
    fn context_is_valid(&self, context: &RclContext) -> bool {
        self.inner.context_is_valid(context)
    }
    fn context_get_instance_id(&self, context: &RclContext) -> u64 {
        self.inner.context_get_instance_id(context)
    }
    fn node_get_default_options(&self) -> RclNodeOptions {
        self.inner.node_get_default_options()
    }
    fn node_init(
        &self,
        node: &mut RclNode,
        name: &CStr,
        namespace: &CStr,
        context: &RclContext,
        options: &RclNodeOptions,
    ) -> RclRet {
        self.inner.node_init(node, name, namespace, context, options)
    }
    fn node_fini(&self, node: &mut RclNode) -> RclRet {
        self.inner.node_fini(node)
    }
    fn node_is_valid(&self, node: &RclNode) -> bool {
        self.inner.node_is_valid(node)
    }
    fn node_get_name<'a>(&self, node: &'a RclNode) -> Option<&'a CStr> {
        self.inner.node_get_name(node)
    }
    fn node_get_namespace<'a>(&self, node: &'a RclNode) -> Option<&'a CStr> {
        self.inner.node_get_namespace(node)
    }
    fn publisher_get_default_options(&self) -> RclPublisherOptions {
        self.inner.publisher_get_default_options()
    }
    fn publisher_init(
        &self,
        publisher: &mut RclPublisher,
        node: &RclNode,
        type_support: &TypeSupport,
        topic_name: &CStr,
        options: &RclPublisherOptions,
    ) -> RclRet {
        self.inner
            .publisher_init(publisher, node, type_support, topic_name, options)
    }
    fn publisher_fini(&self, publisher: &mut RclPublisher, node: &RclNode) -> RclRet {
        if self.faults.publisher_fini.load(Ordering::SeqCst) {
            return self.fail("publisher is stuck in the transport");
        }
        self.inner.publisher_fini(publisher, node)
    }
    fn publisher_is_valid(&self, publisher: &RclPublisher) -> bool {
        self.inner.publisher_is_valid(publisher)
    }
    fn publish(&self, publisher: &RclPublisher, message: &SerializedMessage) -> RclRet {
        if self.faults.publish.load(Ordering::SeqCst) {
            let ret = self.fail("transport down");
            if self.faults.hold_publish.load(Ordering::SeqCst) {
                self.faults.publish_entered.store(true, Ordering::SeqCst);
                spin_until(&self.faults.release_publish);
            }
            return ret;
        }
        self.inner.publish(publisher, message)
    }
    fn subscription_get_default_options(&self) -> RclSubscriptionOptions {
        self.inner.subscription_get_default_options()
    }
    fn subscription_init(
        &self,
        subscription: &mut RclSubscription,
        node: &RclNode,
        type_support: &TypeSupport,
        topic_name: &CStr,
        options: &RclSubscriptionOptions,
    ) -> RclRet {
        self.inner
            .subscription_init(subscription, node, type_support, topic_name, options)
    }
    fn subscription_fini(&self, subscription: &mut RclSubscription, node: &RclNode) -> RclRet {
        self.inner.subscription_fini(subscription, node)
    }
    fn subscription_is_valid(&self, subscription: &RclSubscription) -> bool {
        self.inner.subscription_is_valid(subscription)
    }
    fn take(
        &self,
        subscription: &RclSubscription,
        message: &mut SerializedMessage,
        info: &mut MessageInfo,
    ) -> RclRet {
        self.inner.take(subscription, message, info)
    }
    fn wait_set_init(
        &self,
        wait_set: &mut RclWaitSet,
        capacity: WaitSetCapacity,
        allocator: RclAllocator,
    ) -> RclRet {
        self.inner.wait_set_init(wait_set, capacity, allocator)
    }
    fn wait_set_fini(&self, wait_set: &mut RclWaitSet) -> RclRet {
        self.inner.wait_set_fini(wait_set)
    }
    fn wait_set_clear(&self, wait_set: &mut RclWaitSet) -> RclRet {
        self.inner.wait_set_clear(wait_set)
    }
    fn wait_set_add_subscription(
        &self,
        wait_set: &mut RclWaitSet,
        subscription: &RclSubscription,
        index: Option<&mut usize>,
    ) -> RclRet {
        self.inner
            .wait_set_add_subscription(wait_set, subscription, index)
    }
    fn wait(&self, wait_set: &mut RclWaitSet, timeout_ns: i64) -> RclRet {
        self.inner.wait(wait_set, timeout_ns)
    }
}

fn faulty_runtime() -> (Arc<Runtime>, Arc<Faults>) {
    let faults = Arc::new(Faults::default());
    let api = FaultyRcl {
        inner: IntraProcessRcl::new(),
        faults: Arc::clone(&faults),
    };
    (Runtime::new(Arc::new(api), EnvConfig::default()), faults)
}

#[test]
fn test_finalize_failure_still_marks_finalized() -> anyhow::Result<()> {
    let (runtime, faults) = faulty_runtime();
    let ctx = Context::with_runtime(runtime.clone(), &[])?;
    let node = Node::new(&ctx, "n1", "")?;
    let publisher = Publisher::<msg::String>::new(&node, "/t")?;

    faults.publisher_fini.store(true, Ordering::SeqCst);
    let err = publisher.destroy().expect_err("injected fini failure");
    match &err {
        Error::Rcl { message, .. } => assert!(message.contains("stuck"), "{message}"),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(publisher.state(), HandleState::Finalized);
    assert_eq!(runtime.api().take_error_string(), None);

    // The node is no longer pinned by the stuck publisher.
    assert_eq!(node.live_endpoints(), 0);
    node.destroy()?;
    publisher.destroy().expect("second destroy is a no-op");
    Ok(())
}

#[test]
fn test_publish_failure_carries_native_message() -> anyhow::Result<()> {
    let (runtime, faults) = faulty_runtime();
    let ctx = Context::with_runtime(runtime.clone(), &[])?;
    let node = Node::new(&ctx, "n1", "")?;
    let publisher = Publisher::<msg::String>::new(&node, "/t")?;

    faults.publish.store(true, Ordering::SeqCst);
    let err = publisher
        .publish(&msg::String::new("x"))
        .expect_err("injected publish failure");
    assert_eq!(err.kind(), ErrorKind::Error);
    assert!(err.to_string().contains("transport down"));
    assert_eq!(runtime.api().get_error_string(), rclkit_native::ERROR_NOT_SET);

    faults.publish.store(false, Ordering::SeqCst);
    publisher.publish(&msg::String::new("x"))?;
    Ok(())
}

#[test]
fn test_stale_error_does_not_leak_into_next_failure() -> anyhow::Result<()> {
    let (runtime, faults) = faulty_runtime();
    let ctx = Context::with_runtime(runtime, &[])?;
    let node = Node::new(&ctx, "n1", "")?;
    let publisher = Publisher::<msg::String>::new(&node, "/t")?;

    faults.publish.store(true, Ordering::SeqCst);
    let _ = publisher.publish(&msg::String::new("x"));

    let err = Node::new(&ctx, "9bad", "").expect_err("bad name");
    match err {
        Error::InvalidArgument(message) => {
            assert!(message.contains("9bad"), "{message}");
            assert!(!message.contains("transport"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    Ok(())
}

#[test]
fn test_wait_rejection_does_not_touch_pending_error() -> anyhow::Result<()> {
    let (runtime, faults) = faulty_runtime();
    let ctx = Context::with_runtime(runtime, &[])?;
    let node = Node::new(&ctx, "n1", "")?;
    let publisher = Publisher::<msg::String>::new(&node, "/t")?;
    let empty = WaitSet::for_subscriptions(&ctx, 1)?;

    faults.publish.store(true, Ordering::SeqCst);
    faults.hold_publish.store(true, Ordering::SeqCst);
    let (publish_result, wait_result) = std::thread::scope(|scope| {
        let publishing = scope.spawn(|| publisher.publish(&msg::String::new("x")));
        assert!(spin_until(&faults.publish_entered), "publish never reached the runtime");
        let wait_result = empty.wait(WaitTimeout::Poll);
        faults.release_publish.store(true, Ordering::SeqCst);
        (publishing.join().expect("publish thread"), wait_result)
    });

    let publish_err = publish_result.expect_err("injected publish failure");
    assert!(publish_err.to_string().contains("transport down"), "{publish_err}");
    match wait_result.expect_err("empty wait set") {
        Error::InvalidArgument(message) => {
            assert!(message.contains("no registered subscriptions"), "{message}")
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(ctx.runtime().api().take_error_string(), None);
    Ok(())
}

#[test]
fn test_teardown_continues_past_failures() -> anyhow::Result<()> {
    let (runtime, faults) = faulty_runtime();
    let ctx = Context::with_runtime(runtime, &[])?;
    let node = Node::new(&ctx, "n1", "")?;
    let publisher = Publisher::<msg::String>::new(&node, "/t")?;
    let subscription = Subscription::<msg::String>::new(&node, "/t")?;

    faults.publisher_fini.store(true, Ordering::SeqCst);
    let mut teardown = Teardown::new();
    teardown
        .push(&ctx)
        .push(&node)
        .push(&subscription)
        .push(&publisher);
    let report = teardown.run();

    assert!(!report.is_clean());
    assert_eq!(report.failures().count(), 1);
    assert!(report
        .steps
        .iter()
        .all(|step| step.state_after == HandleState::Finalized));
    assert_eq!(ctx.state(), HandleState::Finalized);
    Ok(())
}

#[test]
fn test_publisher_invalid_code_maps_to_invalid_argument() {
    let err = Error::from_ret(rclkit::ReturnCode::from_raw(RCL_RET_PUBLISHER_INVALID), None);
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
