// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resource handle state machine and child accounting.
//!
//! Every entity kind wraps its native struct in a [`Handle`]:
//!
//! ```text
//! Inert --initialize--> Valid --finalize--> Finalized
//!   \________________finalize (no-op)_________/
//! ```
//!
//! Initialize failures leave the handle `Inert` with a zeroed native struct.
//! Finalize failures are returned to the caller, but the handle is marked
//! `Finalized` anyway so a stuck native resource cannot pin its parent.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lifecycle state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// Zero-initialized: object-shaped, not registered with the runtime.
    Inert,
    Valid,
    Finalized,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandleState::Inert => "inert",
            HandleState::Valid => "valid",
            HandleState::Finalized => "finalized",
        })
    }
}

/// Entity kinds managed by the lifecycle layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    InitOptions,
    Context,
    Node,
    Publisher,
    Subscription,
    WaitSet,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::InitOptions => "init options",
            EntityKind::Context => "context",
            EntityKind::Node => "node",
            EntityKind::Publisher => "publisher",
            EntityKind::Subscription => "subscription",
            EntityKind::WaitSet => "wait set",
        })
    }
}

impl Error {
    /// Error for an operation that needs a `Valid` handle.
    pub(crate) fn invalid_handle(kind: EntityKind, state: HandleState) -> Self {
        match kind {
            EntityKind::Context | EntityKind::InitOptions => Error::NotInitialized,
            _ => Error::invalid_argument(format!("{} handle is {}", kind, state)),
        }
    }
}

pub(crate) struct Handle<N> {
    kind: EntityKind,
    state: HandleState,
    native: N,
}

impl<N: Default> Handle<N> {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            state: HandleState::Inert,
            native: N::default(),
        }
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    /// Run `init` against the zeroed native struct and mark the handle
    /// `Valid` on success.
    pub fn initialize(&mut self, init: impl FnOnce(&mut N) -> Result<()>) -> Result<()> {
        match self.state {
            HandleState::Valid => return Err(Error::AlreadyInitialized),
            HandleState::Finalized => {
                return Err(Error::invalid_argument(format!(
                    "{} handle is finalized and cannot be initialized again",
                    self.kind
                )))
            }
            HandleState::Inert => {}
        }
        match init(&mut self.native) {
            Ok(()) => {
                self.state = HandleState::Valid;
                Ok(())
            }
            Err(err) => {
                self.native = N::default();
                Err(err)
            }
        }
    }

    /// Store a native struct that was initialized elsewhere.
    pub fn adopt(&mut self, native: N) -> Result<()> {
        self.initialize(|slot| {
            *slot = native;
            Ok(())
        })
    }

    /// Release the native resource. No-op unless `Valid`.
    ///
    /// `on_release` runs exactly once, when the handle leaves `Valid`,
    /// whether or not `fini` succeeded.
    pub fn finalize(
        &mut self,
        fini: impl FnOnce(&mut N) -> Result<()>,
        on_release: impl FnOnce(),
    ) -> Result<()> {
        if self.state != HandleState::Valid {
            return Ok(());
        }
        let result = fini(&mut self.native);
        self.state = HandleState::Finalized;
        on_release();
        if let Err(err) = &result {
            log::warn!("[rclkit] {} finalized with error: {}", self.kind, err);
        }
        result
    }

    pub fn with_valid<R>(&self, f: impl FnOnce(&N) -> Result<R>) -> Result<R> {
        if self.state != HandleState::Valid {
            return Err(Error::invalid_handle(self.kind, self.state));
        }
        f(&self.native)
    }

    pub fn with_valid_mut<R>(&mut self, f: impl FnOnce(&mut N) -> Result<R>) -> Result<R> {
        if self.state != HandleState::Valid {
            return Err(Error::invalid_handle(self.kind, self.state));
        }
        f(&mut self.native)
    }
}

/// Number of live children registered against a parent handle.
#[derive(Debug, Default)]
pub(crate) struct ChildCount(AtomicUsize);

impl ChildCount {
    pub fn acquire(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn release(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub fn live(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Refuse teardown of `kind` while children are live.
    pub fn ensure_none(&self, kind: EntityKind, children: &str) -> Result<()> {
        match self.live() {
            0 => Ok(()),
            n => Err(Error::invalid_argument(format!(
                "{} still has {} live {}; destroy them first",
                kind, n, children
            ))),
        }
    }
}
