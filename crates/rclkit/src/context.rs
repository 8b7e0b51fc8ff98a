// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime session: the root of the ownership tree.

use crate::error::{Error, Result, ReturnCode};
use crate::handle::{ChildCount, EntityKind, Handle, HandleState};
use crate::runtime::Runtime;
use parking_lot::Mutex;
use rclkit_native::{RclAllocator, RclContext, RclInitOptions};
use std::ffi::CString;
use std::sync::Arc;

/// Options applied when a context is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitOptions {
    /// `None` uses the runtime's default allocator.
    pub allocator: Option<RclAllocator>,
    pub domain_id: usize,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            allocator: None,
            domain_id: 0,
        }
    }
}

impl InitOptions {
    /// Options taken from the runtime's configuration.
    #[must_use]
    pub fn from_runtime(runtime: &Runtime) -> Self {
        Self {
            allocator: None,
            domain_id: runtime.config().domain_id,
        }
    }

    #[must_use]
    pub fn with_allocator(mut self, allocator: RclAllocator) -> Self {
        self.allocator = Some(allocator);
        self
    }

    #[must_use]
    pub fn with_domain_id(mut self, domain_id: usize) -> Self {
        self.domain_id = domain_id;
        self
    }
}

/// One initialized session of the runtime.
///
/// Only one context may be active per runtime instance. Nodes and wait sets
/// borrow the context, and [`Context::finalize`] refuses while any of them
/// is still live.
pub struct Context {
    runtime: Arc<Runtime>,
    options: Mutex<Handle<RclInitOptions>>,
    handle: Mutex<Handle<RclContext>>,
    children: ChildCount,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("state", &self.state())
            .field("instance_id", &self.instance_id())
            .field("children", &self.children.live())
            .finish()
    }
}

impl Context {
    /// Inert context bound to `runtime`; call [`Context::initialize`] next.
    #[must_use]
    pub fn zero_initialized(runtime: Arc<Runtime>) -> Self {
        Self {
            runtime,
            options: Mutex::new(Handle::new(EntityKind::InitOptions)),
            handle: Mutex::new(Handle::new(EntityKind::Context)),
            children: ChildCount::default(),
        }
    }

    /// Initialized context on the process-wide runtime.
    pub fn new(args: &[&str]) -> Result<Self> {
        let runtime = Runtime::global()?;
        let options = InitOptions::from_runtime(&runtime);
        Self::init(runtime, args, &options)
    }

    /// Initialized context on `runtime` with its configured options.
    pub fn with_runtime(runtime: Arc<Runtime>, args: &[&str]) -> Result<Self> {
        let options = InitOptions::from_runtime(&runtime);
        Self::init(runtime, args, &options)
    }

    pub fn init(runtime: Arc<Runtime>, args: &[&str], options: &InitOptions) -> Result<Self> {
        let context = Self::zero_initialized(runtime);
        context.initialize(args, options)?;
        Ok(context)
    }

    /// Initialize the session.
    ///
    /// Fails with `AlreadyInitialized` if this handle is valid or another
    /// context is active on the runtime. On failure nothing stays allocated
    /// and the handle remains inert.
    pub fn initialize(&self, args: &[&str], options: &InitOptions) -> Result<()> {
        let args = args
            .iter()
            .map(|arg| CString::new(*arg))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let allocator = options
            .allocator
            .unwrap_or_else(|| self.runtime.default_allocator());
        let rt = &self.runtime;

        let mut handle = self.handle.lock();
        handle.initialize(|native| {
            let mut init_options = RclInitOptions::zero_initialized();
            rt.invoke("rcl_init_options_init", |api| {
                api.init_options_init(&mut init_options, allocator)
            })?;
            let started = rt
                .invoke("rcl_init_options_set_domain_id", |api| {
                    api.init_options_set_domain_id(&mut init_options, options.domain_id)
                })
                .and_then(|()| {
                    rt.invoke("rcl_init", |api| api.init(&args, &init_options, native))
                });
            if let Err(err) = started {
                if let Err(cleanup) =
                    rt.invoke("rcl_init_options_fini", |api| api.init_options_fini(&mut init_options))
                {
                    log::warn!("[rclkit] init options cleanup failed: {}", cleanup);
                }
                return Err(err);
            }
            self.options.lock().adopt(init_options)
        })?;

        log::debug!(
            "[rclkit] context {} initialized (domain {})",
            handle.native().instance_id(),
            options.domain_id
        );
        Ok(())
    }

    /// Shut the session down at the runtime level.
    ///
    /// The handle stays addressable for [`Context::finalize`]. Shutting down
    /// an already shut down context is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        let mut handle = self.handle.lock();
        if handle.state() == HandleState::Finalized {
            return Ok(());
        }
        let rt = &self.runtime;
        let code = handle.with_valid_mut(|native| {
            rt.invoke_with(
                "rcl_shutdown",
                |api| api.shutdown(native),
                &[ReturnCode::NotInit],
            )
        })?;
        if code == ReturnCode::NotInit {
            log::debug!("[rclkit] context already shut down");
        }
        Ok(())
    }

    /// Release the context and then its init options.
    ///
    /// Refuses while nodes or wait sets created from this context are live,
    /// or while the context has not been shut down. No-op unless valid.
    pub fn finalize(&self) -> Result<()> {
        let rt = &self.runtime;
        let mut handle = self.handle.lock();
        // Children register under this lock.
        self.children
            .ensure_none(EntityKind::Context, "nodes or wait sets")?;
        if handle.state() == HandleState::Valid && rt.api().context_is_valid(handle.native()) {
            return Err(Error::invalid_argument(
                "context must be shut down before it is finalized",
            ));
        }
        let context_result =
            handle.finalize(|native| rt.invoke("rcl_context_fini", |api| api.context_fini(native)), || {});
        let options_result = self.options.lock().finalize(
            |native| rt.invoke("rcl_init_options_fini", |api| api.init_options_fini(native)),
            || {},
        );
        context_result.and(options_result)
    }

    /// Shutdown (tolerating an already shut down session) then finalize.
    pub fn dispose(&self) -> Result<()> {
        match self.shutdown() {
            Ok(()) | Err(Error::NotInitialized) => {}
            Err(err) => log::warn!("[rclkit] context shutdown failed: {}", err),
        }
        self.finalize()
    }

    /// Whether the runtime still considers the session valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let handle = self.handle.lock();
        handle.state() == HandleState::Valid && self.runtime.api().context_is_valid(handle.native())
    }

    #[must_use]
    pub fn state(&self) -> HandleState {
        self.handle.lock().state()
    }

    /// Opaque instance identity while the handle is valid.
    #[must_use]
    pub fn instance_id(&self) -> Option<u64> {
        let handle = self.handle.lock();
        (handle.state() == HandleState::Valid)
            .then(|| self.runtime.api().context_get_instance_id(handle.native()))
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Nodes and wait sets currently alive under this context.
    #[must_use]
    pub fn live_children(&self) -> usize {
        self.children.live()
    }

    pub(crate) fn children(&self) -> &ChildCount {
        &self.children
    }

    /// Run `f` with the native context if the handle is valid.
    pub(crate) fn with_native<R>(&self, f: impl FnOnce(&RclContext) -> Result<R>) -> Result<R> {
        self.handle.lock().with_valid(f)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if self.state() != HandleState::Valid {
            return;
        }
        if let Err(err) = self.dispose() {
            log::warn!("[rclkit] context dispose on drop failed: {}", err);
        }
    }
}
