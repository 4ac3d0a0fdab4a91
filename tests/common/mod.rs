//! Shared fixtures: a synthetic two-level index that stores raw slot words
//! in fixed fan-out nodes, plus entries and resolvers for driving the
//! engine from tests.
//!
//! The container locks follow the engine's own `shuttle` feature switch:
//! the scanner takes them while the scheduler can preempt it, so schedule
//! exploration has to be able to see them.

#![allow(dead_code)]

use std::collections::HashMap;

#[cfg(not(feature = "shuttle"))]
use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "shuttle")]
use shuttle::sync::{Mutex, MutexGuard};

use workingset::{
    Accounted, DomainId, DomainResolver, IndexBackend, NodeGuard, NodeKey, PartitionId,
    PartitionState, RawSlot, ShadowLru, ShadowToken, SingleDomain,
};

pub const FAN_OUT: usize = 8;

/// A cache entry with fixed accounting coordinates.
pub struct TestEntry {
    domain: DomainId,
    partition: PartitionId,
}

impl TestEntry {
    pub fn new(domain: u16, partition: u16) -> TestEntry {
        TestEntry {
            domain: DomainId::new(domain),
            partition: PartitionId::new(partition),
        }
    }
}

impl Accounted for TestEntry {
    fn domain(&self) -> DomainId {
        self.domain
    }

    fn partition(&self) -> PartitionId {
        self.partition
    }
}

/// Resolver in which only the default domain exists. Entries tagged with any
/// other domain behave as if their domain had been destroyed.
pub struct RootOnly(pub SingleDomain);

impl DomainResolver for RootOnly {
    fn resolve(&self, domain: DomainId, partition: PartitionId) -> Option<&PartitionState> {
        if domain != DomainId::DEFAULT {
            return None;
        }
        self.0.resolve(domain, partition)
    }
}

/// One node of the synthetic index.
pub struct TestNode {
    pub slots: [Option<RawSlot>; FAN_OUT],
    pub live: usize,
    pub shadows: usize,
}

impl TestNode {
    fn from_slots(slots: &[RawSlot]) -> TestNode {
        assert!(slots.len() <= FAN_OUT);
        let mut node = TestNode {
            slots: [None; FAN_OUT],
            live: 0,
            shadows: 0,
        };
        for (i, raw) in slots.iter().enumerate() {
            node.slots[i] = Some(*raw);
            if raw.is_shadow() {
                node.shadows += 1;
            } else {
                node.live += 1;
            }
        }
        node
    }
}

/// The node table and token tally of one container, guarded by the
/// container's structural lock.
#[derive(Default)]
pub struct TestTree {
    pub nodes: HashMap<u64, TestNode>,
    pub shadow_entries: usize,
}

/// A host index made of independently locked containers. Node keys route to
/// their container through the key's high half.
pub struct SyntheticIndex {
    containers: Vec<Mutex<TestTree>>,
}

impl SyntheticIndex {
    pub fn new(containers: usize) -> SyntheticIndex {
        SyntheticIndex {
            containers: (0..containers).map(|_| Mutex::default()).collect(),
        }
    }

    pub fn key(container: usize, node: u64) -> NodeKey {
        NodeKey::new((container as u64) << 32 | node)
    }

    fn split(key: NodeKey) -> (usize, u64) {
        ((key.as_u64() >> 32) as usize, key.as_u64() & 0xffff_ffff)
    }

    /// Locks a container the way the host's index maintenance would. Tests
    /// also use this to hold a scanner's candidate hostage.
    pub fn lock_container(&self, container: usize) -> MutexGuard<'_, TestTree> {
        self.containers[container].lock().unwrap()
    }

    fn insert_locked(tree: &mut TestTree, node: u64, slots: &[RawSlot]) {
        let n = TestNode::from_slots(slots);
        tree.shadow_entries += n.shadows;
        let prev = tree.nodes.insert(node, n);
        assert!(prev.is_none(), "node {node} created twice");
    }

    /// Creates a node populated from `slots` and returns its key.
    pub fn insert_node(&self, container: usize, node: u64, slots: &[RawSlot]) -> NodeKey {
        let mut tree = self.lock_container(container);
        Self::insert_locked(&mut tree, node, slots);
        Self::key(container, node)
    }

    /// Creates a token-only node.
    pub fn insert_shadow_node(
        &self,
        container: usize,
        node: u64,
        tokens: &[ShadowToken],
    ) -> NodeKey {
        let slots: Vec<RawSlot> = tokens.iter().map(|t| t.raw()).collect();
        self.insert_node(container, node, &slots)
    }

    /// Publishes a token-only node and queues it for reclaim under a single
    /// container lock hold, the way host index maintenance does.
    pub fn publish_shadow_node(
        &self,
        lru: &ShadowLru,
        container: usize,
        node: u64,
        tokens: &[ShadowToken],
    ) -> NodeKey {
        let slots: Vec<RawSlot> = tokens.iter().map(|t| t.raw()).collect();
        let mut tree = self.lock_container(container);
        Self::insert_locked(&mut tree, node, &slots);

        let key = Self::key(container, node);
        lru.note_shadow_only(key);
        key
    }

    pub fn node_exists(&self, key: NodeKey) -> bool {
        let (container, node) = Self::split(key);
        self.lock_container(container).nodes.contains_key(&node)
    }

    /// Number of tokens the node currently stores, if it exists.
    pub fn node_shadow_entries(&self, key: NodeKey) -> Option<usize> {
        let (container, node) = Self::split(key);
        self.lock_container(container)
            .nodes
            .get(&node)
            .map(|n| n.shadows)
    }

    pub fn container_shadow_entries(&self, container: usize) -> usize {
        self.lock_container(container).shadow_entries
    }

    /// Overwrites a node's entry counts while leaving its slots alone,
    /// simulating corrupted index bookkeeping.
    pub fn set_node_counts(&self, key: NodeKey, live: usize, shadows: usize) {
        let (container, node) = Self::split(key);
        let mut tree = self.lock_container(container);
        let n = tree.nodes.get_mut(&node).unwrap();
        n.live = live;
        n.shadows = shadows;
    }
}

pub struct TestNodeGuard<'a> {
    tree: MutexGuard<'a, TestTree>,
    node: u64,
}

impl NodeGuard for TestNodeGuard<'_> {
    fn live_entries(&self) -> usize {
        self.tree.nodes[&self.node].live
    }

    fn shadow_entries(&self) -> usize {
        self.tree.nodes[&self.node].shadows
    }

    fn slot_count(&self) -> usize {
        FAN_OUT
    }

    fn slot(&self, slot: usize) -> Option<RawSlot> {
        self.tree.nodes[&self.node].slots[slot]
    }

    fn clear_slot(&mut self, slot: usize) {
        let node = self.tree.nodes.get_mut(&self.node).unwrap();
        let raw = node.slots[slot].take().unwrap();
        assert!(raw.is_shadow(), "cleared a live slot");
        node.shadows -= 1;
        self.tree.shadow_entries -= 1;
    }

    fn delete(mut self) -> bool {
        let occupied = self.tree.nodes[&self.node].slots.iter().any(|s| s.is_some());
        if occupied {
            return false;
        }
        self.tree.nodes.remove(&self.node);
        true
    }
}

impl IndexBackend for SyntheticIndex {
    type Guard<'a>
        = TestNodeGuard<'a>
    where
        Self: 'a;

    fn try_lock_node(&self, key: NodeKey) -> Option<TestNodeGuard<'_>> {
        let (container, node) = Self::split(key);
        let tree = self.containers[container].try_lock().ok()?;
        Some(TestNodeGuard { tree, node })
    }
}
