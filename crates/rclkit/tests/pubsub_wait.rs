// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// End-to-end delivery through the safe layer:
// context -> node -> publisher/subscription -> wait set -> take

use rclkit::msg;
use rclkit::{
    Context, ErrorKind, HandleState, Node, Publisher, QosProfile, RclAllocator, Runtime,
    Subscription, SubscriptionOptions, WaitSet, WaitSetCapacity, WaitStatus, WaitTimeout,
};
use std::time::{Duration, Instant};

fn context() -> Context {
    Context::with_runtime(Runtime::intra_process(), &[]).expect("context")
}

#[test]
fn test_publish_wait_take_round_trip() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "/ns")?;
    let publisher = Publisher::<msg::String>::new(&node, "/t")?;
    let subscription = Subscription::<msg::String>::new(&node, "/t")?;

    let wait_set = WaitSet::for_subscriptions(&ctx, 1)?;
    let slot = wait_set.add_subscription(&subscription)?;

    publisher.publish(&msg::String::new("hello"))?;

    let status = wait_set.wait(Duration::from_secs(1))?;
    assert_eq!(status, WaitStatus::Ready);
    assert!(wait_set.is_ready(slot));
    assert!(wait_set.is_subscription_ready(&subscription));
    assert_eq!(wait_set.ready_slots(), vec![slot]);

    let (message, info) = subscription.take()?.expect("one message pending");
    assert_eq!(message.data, "hello");
    assert_eq!(info.publication_sequence_number, 1);
    assert!(info.from_intra_process);

    assert!(subscription.take()?.is_none(), "nothing new is pending");
    Ok(())
}

#[test]
fn test_wait_times_out_and_clears_slot() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "/ns")?;
    let subscription = Subscription::<msg::String>::new(&node, "/t")?;
    let wait_set = WaitSet::new(
        &ctx,
        WaitSetCapacity::subscriptions(1),
        ctx.runtime().default_allocator(),
    )?;
    let slot = wait_set.add_subscription(&subscription)?;

    let started = Instant::now();
    let status = wait_set.wait(Duration::from_millis(10))?;
    assert_eq!(status, WaitStatus::TimedOut);
    assert!(started.elapsed() >= Duration::from_millis(10));
    assert!(!wait_set.is_ready(slot));
    assert!(wait_set.ready_slots().is_empty());
    Ok(())
}

#[test]
fn test_poll_does_not_block() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let subscription = Subscription::<msg::Bool>::new(&node, "flag")?;
    let wait_set = WaitSet::for_subscriptions(&ctx, 1)?;
    wait_set.add_subscription(&subscription)?;

    let started = Instant::now();
    assert_eq!(wait_set.wait(WaitTimeout::Poll)?, WaitStatus::TimedOut);
    assert!(started.elapsed() < Duration::from_millis(500));
    Ok(())
}

#[test]
fn test_wait_forever_wakes_on_publish_from_other_thread() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let publisher = Publisher::<msg::Bool>::new(&node, "/flag")?;
    let subscription = Subscription::<msg::Bool>::new(&node, "/flag")?;
    let wait_set = WaitSet::for_subscriptions(&ctx, 1)?;
    wait_set.add_subscription(&subscription)?;

    let status = std::thread::scope(|scope| {
        scope.spawn(|| {
            std::thread::sleep(Duration::from_millis(20));
            publisher.publish(&msg::Bool { data: true }).expect("publish");
        });
        wait_set.wait(WaitTimeout::Forever)
    })?;
    assert_eq!(status, WaitStatus::Ready);
    let (message, _) = subscription.take()?.expect("flag");
    assert!(message.data);
    Ok(())
}

#[test]
fn test_only_ready_subscriptions_keep_their_slot() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "/ns")?;
    let quiet = Subscription::<msg::String>::new(&node, "quiet")?;
    let busy = Subscription::<msg::String>::new(&node, "busy")?;
    let publisher = Publisher::<msg::String>::new(&node, "busy")?;

    let wait_set = WaitSet::for_subscriptions(&ctx, 2)?;
    let quiet_slot = wait_set.add_subscription(&quiet)?;
    let busy_slot = wait_set.add_subscription(&busy)?;
    assert_eq!((quiet_slot, busy_slot), (0, 1));

    publisher.publish(&msg::String::new("x"))?;
    assert_eq!(wait_set.wait(Duration::from_secs(1))?, WaitStatus::Ready);
    assert!(!wait_set.is_subscription_ready(&quiet));
    assert!(wait_set.is_subscription_ready(&busy));
    assert_eq!(wait_set.ready_slots(), vec![busy_slot]);
    Ok(())
}

#[test]
fn test_rearm_restores_membership_between_cycles() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let publisher = Publisher::<msg::String>::new(&node, "/loop")?;
    let subscription = Subscription::<msg::String>::new(&node, "/loop")?;
    let wait_set = WaitSet::for_subscriptions(&ctx, 1)?;
    wait_set.add_subscription(&subscription)?;

    for round in 0..3 {
        publisher.publish(&msg::String::new(format!("round {round}")))?;
        assert_eq!(wait_set.wait(Duration::from_secs(1))?, WaitStatus::Ready);
        let (message, _) = subscription.take()?.expect("message");
        assert_eq!(message.data, format!("round {round}"));

        assert_eq!(wait_set.wait(WaitTimeout::Poll)?, WaitStatus::TimedOut);
        wait_set.rearm()?;
        assert_eq!(wait_set.registered(), 1);
    }
    Ok(())
}

#[test]
fn test_wait_set_capacity_is_enforced() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let a = Subscription::<msg::String>::new(&node, "a")?;
    let b = Subscription::<msg::String>::new(&node, "b")?;
    let wait_set = WaitSet::for_subscriptions(&ctx, 1)?;
    assert_eq!(wait_set.capacity(), 1);

    wait_set.add_subscription(&a)?;
    let err = wait_set.add_subscription(&b).expect_err("no free slot");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(wait_set.registered(), 1);
    assert_eq!(ctx.runtime().api().take_error_string(), None);

    wait_set.clear()?;
    assert_eq!(wait_set.registered(), 0);
    let err = wait_set.wait(WaitTimeout::Poll).expect_err("empty wait set");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(wait_set.add_subscription(&b)?, 0);
    Ok(())
}

#[test]
fn test_wait_set_over_budget_is_bad_allocation() {
    let ctx = context();
    let wait_set = rclkit::WaitSet::zero_initialized(&ctx);
    let err = wait_set
        .initialize(
            WaitSetCapacity::subscriptions(4096),
            RclAllocator::with_budget(256),
        )
        .expect_err("over budget");
    assert_eq!(err.kind(), ErrorKind::BadAllocation);
    assert_eq!(wait_set.state(), HandleState::Inert);
    assert_eq!(ctx.live_children(), 0);
}

#[test]
fn test_invalid_subscription_cannot_be_registered() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let inert = Subscription::<msg::String>::zero_initialized(&node);
    let wait_set = WaitSet::for_subscriptions(&ctx, 1)?;
    let err = wait_set.add_subscription(&inert).expect_err("inert subscription");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    Ok(())
}

#[test]
fn test_keep_last_depth_bounds_queue() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let publisher = Publisher::<msg::String>::new(&node, "/burst")?;
    let subscription = Subscription::<msg::String>::with_options(
        &node,
        "/burst",
        &SubscriptionOptions::with_qos(QosProfile::keep_last(2)),
    )?;
    for i in 0..5 {
        publisher.publish(&msg::String::new(i.to_string()))?;
    }
    let mut received = Vec::new();
    while let Some((message, _)) = subscription.take()? {
        received.push(message.data);
    }
    assert_eq!(received, vec!["3", "4"]);
    Ok(())
}

#[test]
fn test_transient_local_replays_to_late_joiner() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let latched = QosProfile::keep_last(1).transient_local();
    let publisher = Publisher::<msg::String>::with_options(
        &node,
        "/map",
        &rclkit::PublisherOptions::with_qos(latched),
    )?;
    publisher.publish(&msg::String::new("old"))?;
    publisher.publish(&msg::String::new("latest"))?;

    let late = Subscription::<msg::String>::with_options(
        &node,
        "/map",
        &SubscriptionOptions::with_qos(latched),
    )?;
    let (message, _) = late.take()?.expect("replayed sample");
    assert_eq!(message.data, "latest");
    assert!(late.take()?.is_none());
    Ok(())
}

#[test]
fn test_topic_names_expand_against_node() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "/ns")?;
    let relative = Publisher::<msg::String>::new(&node, "chatter")?;
    let private = Subscription::<msg::String>::new(&node, "~/status")?;
    assert_eq!(relative.topic_name()?, "/ns/chatter");
    assert_eq!(private.topic_name()?, "/ns/n1/status");

    let err = Publisher::<msg::String>::new(&node, "bad topic").expect_err("space");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = Subscription::<msg::String>::new(&node, "").expect_err("empty");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    Ok(())
}

#[test]
fn test_messages_do_not_cross_types() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let flag = Publisher::<msg::Bool>::new(&node, "/t")?;
    let text = Subscription::<msg::String>::new(&node, "/t")?;
    flag.publish(&msg::Bool { data: true })?;
    assert!(text.take()?.is_none());
    Ok(())
}

#[test]
fn test_inspection_waits_behind_forever_wait() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let publisher = Publisher::<msg::String>::new(&node, "/t")?;
    let subscription = Subscription::<msg::String>::new(&node, "/t")?;
    let wait_set = WaitSet::for_subscriptions(&ctx, 1)?;
    let slot = wait_set.add_subscription(&subscription)?;

    let status = std::thread::scope(|scope| {
        let waiter = scope.spawn(|| wait_set.wait(WaitTimeout::Forever));
        std::thread::sleep(Duration::from_millis(20));
        publisher.publish(&msg::String::new("wake"))?;
        // Blocks until the waiter has returned if it already holds the lock.
        assert_eq!(wait_set.ready_slots(), vec![slot]);
        waiter.join().expect("waiter thread")
    })?;
    assert_eq!(status, WaitStatus::Ready);
    assert!(wait_set.is_ready(slot));
    Ok(())
}

#[test]
fn test_wait_after_timeout_requires_rearm() -> anyhow::Result<()> {
    let ctx = context();
    let node = Node::new(&ctx, "n1", "")?;
    let subscription = Subscription::<msg::String>::new(&node, "/t")?;
    let wait_set = WaitSet::for_subscriptions(&ctx, 1)?;
    wait_set.add_subscription(&subscription)?;

    assert_eq!(wait_set.wait(WaitTimeout::Poll)?, WaitStatus::TimedOut);
    let err = wait_set.wait(WaitTimeout::Poll).expect_err("all slots cleared");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(ctx.runtime().api().take_error_string(), None);

    wait_set.rearm()?;
    assert_eq!(wait_set.wait(WaitTimeout::Poll)?, WaitStatus::TimedOut);
    Ok(())
}
