// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Return-code model.
//!
//! Native calls return an [`RclRet`]. [`ReturnCode`] names the values the
//! lifecycle layer reacts to, [`ErrorKind`] is the closed taxonomy every
//! operation reports in, and [`Error`] carries the native message where the
//! taxonomy keeps one.

use rclkit_native::ret::*;
use rclkit_native::RclRet;
use std::fmt;
use thiserror::Error;

/// Closed outcome taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Ok,
    AlreadyInitialized,
    NotInitialized,
    InvalidArgument,
    BadAllocation,
    Timeout,
    Error,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Ok => "ok",
            ErrorKind::AlreadyInitialized => "already initialized",
            ErrorKind::NotInitialized => "not initialized",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::BadAllocation => "bad allocation",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Error => "error",
        };
        f.write_str(name)
    }
}

/// Native return codes known to the lifecycle layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Ok,
    Error,
    Timeout,
    Unsupported,
    BadAlloc,
    InvalidArgument,
    AlreadyInit,
    NotInit,
    TopicNameInvalid,
    NodeInvalid,
    NodeInvalidName,
    NodeInvalidNamespace,
    PublisherInvalid,
    SubscriptionInvalid,
    SubscriptionTakeFailed,
    WaitSetInvalid,
    WaitSetEmpty,
    WaitSetFull,
    Other(RclRet),
}

impl ReturnCode {
    #[must_use]
    pub fn from_raw(code: RclRet) -> Self {
        match code {
            RCL_RET_OK => Self::Ok,
            RCL_RET_ERROR => Self::Error,
            RCL_RET_TIMEOUT => Self::Timeout,
            RCL_RET_UNSUPPORTED => Self::Unsupported,
            RCL_RET_BAD_ALLOC => Self::BadAlloc,
            RCL_RET_INVALID_ARGUMENT => Self::InvalidArgument,
            RCL_RET_ALREADY_INIT => Self::AlreadyInit,
            RCL_RET_NOT_INIT => Self::NotInit,
            RCL_RET_TOPIC_NAME_INVALID => Self::TopicNameInvalid,
            RCL_RET_NODE_INVALID => Self::NodeInvalid,
            RCL_RET_NODE_INVALID_NAME => Self::NodeInvalidName,
            RCL_RET_NODE_INVALID_NAMESPACE => Self::NodeInvalidNamespace,
            RCL_RET_PUBLISHER_INVALID => Self::PublisherInvalid,
            RCL_RET_SUBSCRIPTION_INVALID => Self::SubscriptionInvalid,
            RCL_RET_SUBSCRIPTION_TAKE_FAILED => Self::SubscriptionTakeFailed,
            RCL_RET_WAIT_SET_INVALID => Self::WaitSetInvalid,
            RCL_RET_WAIT_SET_EMPTY => Self::WaitSetEmpty,
            RCL_RET_WAIT_SET_FULL => Self::WaitSetFull,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub fn raw(self) -> RclRet {
        match self {
            Self::Ok => RCL_RET_OK,
            Self::Error => RCL_RET_ERROR,
            Self::Timeout => RCL_RET_TIMEOUT,
            Self::Unsupported => RCL_RET_UNSUPPORTED,
            Self::BadAlloc => RCL_RET_BAD_ALLOC,
            Self::InvalidArgument => RCL_RET_INVALID_ARGUMENT,
            Self::AlreadyInit => RCL_RET_ALREADY_INIT,
            Self::NotInit => RCL_RET_NOT_INIT,
            Self::TopicNameInvalid => RCL_RET_TOPIC_NAME_INVALID,
            Self::NodeInvalid => RCL_RET_NODE_INVALID,
            Self::NodeInvalidName => RCL_RET_NODE_INVALID_NAME,
            Self::NodeInvalidNamespace => RCL_RET_NODE_INVALID_NAMESPACE,
            Self::PublisherInvalid => RCL_RET_PUBLISHER_INVALID,
            Self::SubscriptionInvalid => RCL_RET_SUBSCRIPTION_INVALID,
            Self::SubscriptionTakeFailed => RCL_RET_SUBSCRIPTION_TAKE_FAILED,
            Self::WaitSetInvalid => RCL_RET_WAIT_SET_INVALID,
            Self::WaitSetEmpty => RCL_RET_WAIT_SET_EMPTY,
            Self::WaitSetFull => RCL_RET_WAIT_SET_FULL,
            Self::Other(raw) => raw,
        }
    }

    /// Taxonomy class of this code.
    ///
    /// `SubscriptionTakeFailed` classifies as `Error` here; `take` handles it
    /// before classification because it means "no message".
    #[must_use]
    pub fn kind(self) -> ErrorKind {
        match self {
            Self::Ok => ErrorKind::Ok,
            Self::Timeout => ErrorKind::Timeout,
            Self::BadAlloc => ErrorKind::BadAllocation,
            Self::AlreadyInit => ErrorKind::AlreadyInitialized,
            Self::NotInit => ErrorKind::NotInitialized,
            Self::InvalidArgument
            | Self::TopicNameInvalid
            | Self::NodeInvalid
            | Self::NodeInvalidName
            | Self::NodeInvalidNamespace
            | Self::PublisherInvalid
            | Self::SubscriptionInvalid
            | Self::WaitSetInvalid
            | Self::WaitSetEmpty
            | Self::WaitSetFull => ErrorKind::InvalidArgument,
            Self::Error | Self::Unsupported | Self::SubscriptionTakeFailed | Self::Other(_) => {
                ErrorKind::Error
            }
        }
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.raw())
    }
}

/// Errors reported by lifecycle and data-plane operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("already initialized")]
    AlreadyInitialized,
    #[error("not initialized")]
    NotInitialized,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("bad allocation")]
    BadAllocation,
    #[error("timeout")]
    Timeout,
    #[error("rcl error {code}: {message}")]
    Rcl { code: ReturnCode, message: String },
}

impl Error {
    /// Build the error for a failed native call.
    ///
    /// `message` is the error-slot content read right after the call.
    #[must_use]
    pub fn from_ret(code: ReturnCode, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| format!("{} returned without a message", code));
        match code.kind() {
            ErrorKind::AlreadyInitialized => Self::AlreadyInitialized,
            ErrorKind::NotInitialized => Self::NotInitialized,
            ErrorKind::InvalidArgument => Self::InvalidArgument(message),
            ErrorKind::BadAllocation => Self::BadAllocation,
            ErrorKind::Timeout => Self::Timeout,
            ErrorKind::Ok | ErrorKind::Error => Self::Rcl { code, message },
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInitialized => ErrorKind::AlreadyInitialized,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::BadAllocation => ErrorKind::BadAllocation,
            Self::Timeout => ErrorKind::Timeout,
            Self::Rcl { .. } => ErrorKind::Error,
        }
    }
}

impl From<std::ffi::NulError> for Error {
    fn from(err: std::ffi::NulError) -> Self {
        Self::InvalidArgument(format!("string contains an interior nul byte at {}", err.nul_position()))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
