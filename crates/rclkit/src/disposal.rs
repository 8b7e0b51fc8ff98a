// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deterministic teardown in reverse dependency order.
//!
//! Every entity releases itself on drop, so scope order already tears down
//! children before parents. [`Teardown`] is for callers that want the
//! outcome of each step: entities are registered in creation order and
//! disposed in reverse, and a failing step never stops the ones after it.

use crate::context::Context;
use crate::error::Result;
use crate::handle::{EntityKind, HandleState};
use crate::msg::Message;
use crate::node::Node;
use crate::publisher::Publisher;
use crate::subscription::Subscription;
use crate::wait_set::WaitSet;

/// An entity with an idempotent release path.
pub trait Dispose {
    fn kind(&self) -> EntityKind;

    /// Release the native resource. Calling it again is a no-op.
    fn dispose(&self) -> Result<()>;

    fn state(&self) -> HandleState;
}

impl Dispose for Context {
    fn kind(&self) -> EntityKind {
        EntityKind::Context
    }

    fn dispose(&self) -> Result<()> {
        Context::dispose(self)
    }

    fn state(&self) -> HandleState {
        Context::state(self)
    }
}

impl Dispose for Node<'_> {
    fn kind(&self) -> EntityKind {
        EntityKind::Node
    }

    fn dispose(&self) -> Result<()> {
        self.destroy()
    }

    fn state(&self) -> HandleState {
        Node::state(self)
    }
}

impl<T: Message> Dispose for Publisher<'_, T> {
    fn kind(&self) -> EntityKind {
        EntityKind::Publisher
    }

    fn dispose(&self) -> Result<()> {
        self.destroy()
    }

    fn state(&self) -> HandleState {
        Publisher::state(self)
    }
}

impl<T: Message> Dispose for Subscription<'_, T> {
    fn kind(&self) -> EntityKind {
        EntityKind::Subscription
    }

    fn dispose(&self) -> Result<()> {
        self.destroy()
    }

    fn state(&self) -> HandleState {
        Subscription::state(self)
    }
}

impl Dispose for WaitSet<'_> {
    fn kind(&self) -> EntityKind {
        EntityKind::WaitSet
    }

    fn dispose(&self) -> Result<()> {
        self.destroy()
    }

    fn state(&self) -> HandleState {
        WaitSet::state(self)
    }
}

/// Outcome of one teardown step.
#[derive(Debug)]
pub struct TeardownStep {
    pub kind: EntityKind,
    pub result: Result<()>,
    pub state_after: HandleState,
}

#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Steps in the order they ran (reverse of registration).
    pub steps: Vec<TeardownStep>,
}

impl TeardownReport {
    /// Every step succeeded and left its entity finalized or inert.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.steps
            .iter()
            .all(|step| step.result.is_ok() && step.state_after != HandleState::Valid)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TeardownStep> {
        self.steps.iter().filter(|step| step.result.is_err())
    }
}

/// Ordered teardown of borrowed entities.
#[derive(Default)]
pub struct Teardown<'a> {
    entities: Vec<&'a dyn Dispose>,
}

impl<'a> Teardown<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity; parents first, children after.
    pub fn push(&mut self, entity: &'a dyn Dispose) -> &mut Self {
        self.entities.push(entity);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Dispose every entity, last registered first.
    pub fn run(self) -> TeardownReport {
        let steps = self
            .entities
            .into_iter()
            .rev()
            .map(|entity| {
                let result = entity.dispose();
                if let Err(err) = &result {
                    log::warn!("[rclkit] teardown of {} failed: {}", entity.kind(), err);
                }
                TeardownStep {
                    kind: entity.kind(),
                    result,
                    state_after: entity.state(),
                }
            })
            .collect();
        TeardownReport { steps }
    }
}
