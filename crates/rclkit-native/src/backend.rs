// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime variant selection.
//!
//! The variant is chosen from configuration once per process and handed out
//! as an `Arc<dyn RclApi>`; nothing downstream branches on the kind.

use crate::api::RclApi;
use crate::intra::IntraProcessRcl;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("unknown backend '{0}' (available: intra)")]
    Unknown(String),
    #[error("process backend already selected as '{selected}', cannot switch to '{requested}'")]
    AlreadySelected {
        selected: BackendKind,
        requested: BackendKind,
    },
}

/// Available runtime variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process runtime routing messages between local endpoints.
    #[default]
    Intra,
}

impl BackendKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Intra => "intra",
        }
    }

    /// Build a fresh runtime instance of this kind.
    #[must_use]
    pub fn instantiate(self) -> Arc<dyn RclApi> {
        match self {
            BackendKind::Intra => Arc::new(IntraProcessRcl::new()),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intra" | "intra_process" | "inproc" => Ok(BackendKind::Intra),
            other => Err(BackendError::Unknown(other.to_string())),
        }
    }
}

static PROCESS_BACKEND: OnceLock<(BackendKind, Arc<dyn RclApi>)> = OnceLock::new();

/// Resolve the process-wide runtime, instantiating it on first use.
///
/// Later calls must request the same kind; the first selection wins.
pub fn select(kind: BackendKind) -> Result<Arc<dyn RclApi>, BackendError> {
    let (selected, api) = PROCESS_BACKEND.get_or_init(|| {
        log::info!("[backend] selected '{}' runtime", kind);
        (kind, kind.instantiate())
    });
    if *selected != kind {
        return Err(BackendError::AlreadySelected {
            selected: *selected,
            requested: kind,
        });
    }
    Ok(Arc::clone(api))
}

/// Kind of the process-wide runtime, if one was selected.
#[must_use]
pub fn selected() -> Option<BackendKind> {
    PROCESS_BACKEND.get().map(|(kind, _)| *kind)
}
