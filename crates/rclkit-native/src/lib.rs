// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rclkit native layer
//!
//! The native side of the client binding: integer return codes, the
//! single-slot error state, zero-initialized handle structs and the
//! [`RclApi`] entry-point table, together with the in-process runtime that
//! implements it.
//!
//! Everything here speaks the native vocabulary (`RclRet`, `impl_` fields,
//! `*_init`/`*_fini` pairs). The safe lifecycle layer lives in `rclkit`.

pub mod api;
pub mod backend;
pub mod error_state;
pub mod handles;
pub mod intra;
pub mod names;
pub mod ret;

pub use api::RclApi;
pub use backend::{BackendError, BackendKind};
pub use error_state::{ErrorRecord, ErrorSlot, ERROR_NOT_SET};
pub use handles::*;
pub use intra::{IntraProcessRcl, INTRA_PROCESS_IDENTIFIER};
pub use ret::RclRet;
