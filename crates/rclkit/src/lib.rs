// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Safe lifecycle and polling layer over the native rcl entry points.
//!
//! Entities follow the ownership tree `Context -> Node -> Publisher /
//! Subscription`, with wait sets borrowing the context and the
//! subscriptions they poll. Children borrow their parent, so the compiler
//! enforces teardown order for scoped values; explicit `destroy` calls are
//! checked at runtime against live-child counts.
//!
//! ```no_run
//! use rclkit::msg;
//! use rclkit::{Context, Node, Publisher, Runtime, Subscription, WaitSet, WaitStatus};
//! use std::time::Duration;
//!
//! # fn main() -> rclkit::Result<()> {
//! let context = Context::with_runtime(Runtime::intra_process(), &[])?;
//! let node = Node::new(&context, "talker", "/demo")?;
//! let publisher = Publisher::<msg::String>::new(&node, "chatter")?;
//! let subscription = Subscription::<msg::String>::new(&node, "chatter")?;
//!
//! let wait_set = WaitSet::for_subscriptions(&context, 1)?;
//! wait_set.add_subscription(&subscription)?;
//! publisher.publish(&msg::String::new("hello"))?;
//!
//! if wait_set.wait(Duration::from_secs(1))? == WaitStatus::Ready {
//!     while let Some((message, _info)) = subscription.take()? {
//!         println!("{}", message.data);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod disposal;
pub mod env_config;
pub mod error;
pub mod handle;
pub mod logging;
pub mod msg;
pub mod node;
pub mod publisher;
pub mod runtime;
pub mod subscription;
mod util;
pub mod wait_set;

pub use context::{Context, InitOptions};
pub use disposal::{Dispose, Teardown, TeardownReport, TeardownStep};
pub use env_config::EnvConfig;
pub use error::{Error, ErrorKind, Result, ReturnCode};
pub use handle::{EntityKind, HandleState};
pub use msg::Message;
pub use node::{Node, NodeOptions};
pub use publisher::{Publisher, PublisherOptions};
pub use runtime::Runtime;
pub use subscription::{Subscription, SubscriptionOptions};
pub use wait_set::{WaitSet, WaitStatus, WaitTimeout};

pub use rclkit_native::{
    DurabilityPolicy, HistoryPolicy, MessageInfo, QosProfile, RclAllocator, ReliabilityPolicy,
    TypeSupport, WaitSetCapacity,
};
