// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native return-code vocabulary.
//!
//! Values match the `rcl_ret_t` codes published by the ROS 2 client library
//! so that a linked runtime and the in-process runtime report identically.

/// Signed status returned by every fallible native entry point.
pub type RclRet = i32;

/// Operation completed successfully
pub const RCL_RET_OK: RclRet = 0;
/// Unspecified failure; details are in the error slot
pub const RCL_RET_ERROR: RclRet = 1;
/// Wait deadline elapsed with nothing ready
pub const RCL_RET_TIMEOUT: RclRet = 2;
/// Entry point exists but is not supported by this runtime
pub const RCL_RET_UNSUPPORTED: RclRet = 3;
/// Allocation failed or exceeded the allocator budget
pub const RCL_RET_BAD_ALLOC: RclRet = 10;
/// Invalid argument (null-equivalent handle, bad value)
pub const RCL_RET_INVALID_ARGUMENT: RclRet = 11;

// === Context (100-199) ===
/// Handle or process already initialized
pub const RCL_RET_ALREADY_INIT: RclRet = 100;
/// Handle or process not initialized (or already shut down)
pub const RCL_RET_NOT_INIT: RclRet = 101;
/// Topic name failed validation or expansion
pub const RCL_RET_TOPIC_NAME_INVALID: RclRet = 103;

// === Node (200-299) ===
/// Node handle is not valid
pub const RCL_RET_NODE_INVALID: RclRet = 200;
/// Node name failed validation
pub const RCL_RET_NODE_INVALID_NAME: RclRet = 201;
/// Node namespace failed validation
pub const RCL_RET_NODE_INVALID_NAMESPACE: RclRet = 202;

// === Publisher (300-399) ===
/// Publisher handle is not valid
pub const RCL_RET_PUBLISHER_INVALID: RclRet = 300;

// === Subscription (400-499) ===
/// Subscription handle is not valid
pub const RCL_RET_SUBSCRIPTION_INVALID: RclRet = 400;
/// Take found no message; not an error state
pub const RCL_RET_SUBSCRIPTION_TAKE_FAILED: RclRet = 401;

// === Wait set (900-999) ===
/// Wait set handle is not valid
pub const RCL_RET_WAIT_SET_INVALID: RclRet = 900;
/// Wait called on a wait set with no registered entities
pub const RCL_RET_WAIT_SET_EMPTY: RclRet = 901;
/// Registration would exceed the declared capacity
pub const RCL_RET_WAIT_SET_FULL: RclRet = 902;
