// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serialized access to one native runtime instance.
//!
//! The native error slot holds a single message for the whole runtime, so a
//! failing call and the read-and-clear of its message must not interleave
//! with another thread's native call. Every call that can set the slot goes
//! through [`Runtime::invoke`], which holds the call lock across both steps.
//! The blocking wait is the exception: it runs without the lock and only
//! takes it to collect the message when it fails.

use crate::env_config::EnvConfig;
use crate::error::{Error, Result, ReturnCode};
use parking_lot::Mutex;
use rclkit_native::{BackendKind, IntraProcessRcl, RclAllocator, RclApi, RclRet};
use std::fmt;
use std::sync::{Arc, OnceLock};

pub struct Runtime {
    api: Arc<dyn RclApi>,
    config: EnvConfig,
    call_lock: Mutex<()>,
}

static GLOBAL: OnceLock<Arc<Runtime>> = OnceLock::new();

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("backend", &self.api.identifier())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    #[must_use]
    pub fn new(api: Arc<dyn RclApi>, config: EnvConfig) -> Arc<Self> {
        Arc::new(Self {
            api,
            config,
            call_lock: Mutex::new(()),
        })
    }

    /// Fresh in-process runtime with default configuration.
    ///
    /// Each instance enforces its own single active context, which lets
    /// independent sessions coexist in one process (tests, embedding).
    #[must_use]
    pub fn intra_process() -> Arc<Self> {
        Self::new(Arc::new(IntraProcessRcl::new()), EnvConfig::default())
    }

    /// Process-wide runtime, selected once from the environment.
    pub fn global() -> Result<Arc<Self>> {
        if let Some(runtime) = GLOBAL.get() {
            return Ok(Arc::clone(runtime));
        }
        let config = EnvConfig::from_env();
        let kind: BackendKind = config
            .backend
            .parse()
            .map_err(|err: rclkit_native::BackendError| Error::invalid_argument(err.to_string()))?;
        let api = rclkit_native::backend::select(kind)
            .map_err(|err| Error::invalid_argument(err.to_string()))?;
        log::debug!("[rclkit] global runtime using '{}' backend", api.identifier());
        Ok(Arc::clone(GLOBAL.get_or_init(|| Self::new(api, config))))
    }

    #[must_use]
    pub fn api(&self) -> &dyn RclApi {
        self.api.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Allocator handed to init calls when the caller does not pick one.
    #[must_use]
    pub fn default_allocator(&self) -> RclAllocator {
        match self.config.allocator_budget {
            Some(bytes) => RclAllocator::with_budget(bytes),
            None => self.api.get_default_allocator(),
        }
    }

    /// Run a native call; any non-OK code becomes an [`Error`].
    pub(crate) fn invoke(&self, op: &'static str, call: impl FnOnce(&dyn RclApi) -> RclRet) -> Result<()> {
        self.invoke_with(op, call, &[]).map(|_| ())
    }

    /// Run a native call, accepting `tolerated` codes as success.
    ///
    /// The error slot is read and cleared under the same lock as the call,
    /// also for tolerated codes, so no message outlives its call.
    pub(crate) fn invoke_with(
        &self,
        op: &'static str,
        call: impl FnOnce(&dyn RclApi) -> RclRet,
        tolerated: &[ReturnCode],
    ) -> Result<ReturnCode> {
        let _guard = self.call_lock.lock();
        let code = ReturnCode::from_raw(call(self.api.as_ref()));
        if code.is_ok() {
            return Ok(code);
        }
        let message = self.api.take_error_string();
        Self::classify(op, code, message, tolerated)
    }

    /// Like [`Runtime::invoke_with`] for calls that may block.
    ///
    /// `call` runs without the call lock, so it must only be reached once
    /// its failing preconditions have been ruled out by the caller; a
    /// message it wrote could otherwise be taken by a concurrent call.
    pub(crate) fn invoke_blocking(
        &self,
        op: &'static str,
        call: impl FnOnce(&dyn RclApi) -> RclRet,
        tolerated: &[ReturnCode],
    ) -> Result<ReturnCode> {
        let code = ReturnCode::from_raw(call(self.api.as_ref()));
        if code.is_ok() {
            return Ok(code);
        }
        let message = {
            let _guard = self.call_lock.lock();
            self.api.take_error_string()
        };
        Self::classify(op, code, message, tolerated)
    }

    fn classify(
        op: &'static str,
        code: ReturnCode,
        message: Option<String>,
        tolerated: &[ReturnCode],
    ) -> Result<ReturnCode> {
        if tolerated.contains(&code) {
            if let Some(message) = message {
                log::debug!("[rclkit] {} returned {} (tolerated): {}", op, code, message);
            }
            return Ok(code);
        }
        log::debug!(
            "[rclkit] {} failed with {}: {}",
            op,
            code,
            message.as_deref().unwrap_or("no message")
        );
        Err(Error::from_ret(code, message))
    }
}
