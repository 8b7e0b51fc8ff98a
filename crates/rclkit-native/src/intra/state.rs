// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entity tables of the in-process runtime.

use crate::handles::{
    DurabilityPolicy, EntityId, Gid, MessageInfo, QosProfile, ReliabilityPolicy, TypeSupport,
};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub(crate) struct Sample {
    pub payload: Vec<u8>,
    pub info: MessageInfo,
}

#[derive(Debug)]
pub(crate) struct NodeRecord {
    pub context_instance: u64,
}

#[derive(Debug)]
pub(crate) struct PublisherRecord {
    pub node: EntityId,
    pub topic: String,
    pub type_support: TypeSupport,
    pub qos: QosProfile,
    pub gid: Gid,
    pub sequence: u64,
    /// Last samples kept for transient-local late joiners.
    pub retained: VecDeque<Sample>,
}

#[derive(Debug)]
pub(crate) struct SubscriptionRecord {
    pub node: EntityId,
    pub topic: String,
    pub type_support: TypeSupport,
    pub qos: QosProfile,
    pub queue: VecDeque<Sample>,
}

impl SubscriptionRecord {
    fn matches(&self, publisher: &PublisherRecord) -> bool {
        if self.topic != publisher.topic || self.type_support != publisher.type_support {
            return false;
        }
        // A reliable reader never matches a best-effort writer.
        !(self.qos.reliability == ReliabilityPolicy::Reliable
            && publisher.qos.reliability == ReliabilityPolicy::BestEffort)
    }

    fn enqueue(&mut self, sample: Sample) {
        if let Some(depth) = self.qos.depth() {
            while self.queue.len() >= depth {
                self.queue.pop_front();
            }
        }
        self.queue.push_back(sample);
    }
}

#[derive(Debug, Default)]
pub(crate) struct RuntimeState {
    pub active_context: Option<u64>,
    pub valid_contexts: HashSet<u64>,
    pub nodes: HashMap<EntityId, NodeRecord>,
    pub publishers: HashMap<EntityId, PublisherRecord>,
    pub subscriptions: HashMap<EntityId, SubscriptionRecord>,
    pub wait_sets: HashSet<EntityId>,
}

impl RuntimeState {
    /// Node is registered and its context has not been shut down.
    pub fn node_is_valid(&self, node: EntityId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|record| self.valid_contexts.contains(&record.context_instance))
    }

    pub fn publisher_is_valid(&self, publisher: EntityId) -> bool {
        self.publishers
            .get(&publisher)
            .is_some_and(|record| self.node_is_valid(record.node))
    }

    pub fn subscription_is_valid(&self, subscription: EntityId) -> bool {
        self.subscriptions
            .get(&subscription)
            .is_some_and(|record| self.node_is_valid(record.node))
    }

    pub fn subscription_ready(&self, subscription: EntityId) -> bool {
        self.subscriptions
            .get(&subscription)
            .is_some_and(|record| !record.queue.is_empty())
    }

    /// Route one sample from `publisher` to every matching subscription.
    ///
    /// Returns the number of subscriptions that received it.
    pub fn deliver(&mut self, publisher: EntityId, payload: &[u8], now_ns: i64) -> usize {
        let Some(record) = self.publishers.get_mut(&publisher) else {
            return 0;
        };
        record.sequence += 1;
        let sample = Sample {
            payload: payload.to_vec(),
            info: MessageInfo {
                source_timestamp_ns: now_ns,
                received_timestamp_ns: now_ns,
                publication_sequence_number: record.sequence,
                publisher_gid: record.gid,
                from_intra_process: true,
            },
        };

        if record.qos.durability == DurabilityPolicy::TransientLocal {
            if let Some(depth) = record.qos.depth() {
                while record.retained.len() >= depth {
                    record.retained.pop_front();
                }
            }
            record.retained.push_back(sample.clone());
        }

        let Some(record) = self.publishers.get(&publisher) else {
            return 0;
        };
        let mut delivered = 0;
        for subscription in self.subscriptions.values_mut() {
            if subscription.matches(record) {
                subscription.enqueue(sample.clone());
                delivered += 1;
            }
        }
        delivered
    }

    /// Replay retained transient-local history into a new subscription.
    pub fn replay_history(&mut self, subscription: EntityId) -> usize {
        let Some(target) = self.subscriptions.get(&subscription) else {
            return 0;
        };
        if target.qos.durability != DurabilityPolicy::TransientLocal {
            return 0;
        }

        let mut history: Vec<Sample> = self
            .publishers
            .values()
            .filter(|publisher| {
                publisher.qos.durability == DurabilityPolicy::TransientLocal
                    && target.matches(publisher)
            })
            .flat_map(|publisher| publisher.retained.iter().cloned())
            .collect();
        history.sort_by_key(|sample| sample.info.source_timestamp_ns);

        let replayed = history.len();
        if let Some(target) = self.subscriptions.get_mut(&subscription) {
            for sample in history {
                target.enqueue(sample);
            }
        }
        replayed
    }
}
