use super::BasicBlock;
use log::debug;
use parking_lot::{Mutex, MutexGuard};
pub use petgraph::graph::NodeIndex;
use petgraph::{stable_graph::StableDiGraph, visit::EdgeRef, Direction};
use std::sync::Arc;

/// Handle of a block owned by a [`CfgManager`].
pub type BlockIndex = NodeIndex;

pub type ControlFlowGraph = StableDiGraph<BasicBlock, ()>;

/// Blocks and successor edges of one exploration session. Nothing is ever
/// removed; the visited list is a passive record for the driver.
#[derive(Debug, Default)]
pub struct CfgManager {
    session: u64,
    graph: ControlFlowGraph,
    visited: Vec<BlockIndex>,
}

impl CfgManager {
    pub fn new(session: u64) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn name(&self) -> String {
        format!("CFG_{}", self.session)
    }

    pub fn graph(&self) -> &ControlFlowGraph {
        &self.graph
    }

    pub fn add_basic_block(&mut self, block: BasicBlock) -> BlockIndex {
        let id = block.id();
        let index = self.graph.add_node(block);

        debug!("{}: added block {} as b{}", self.name(), id, index.index());

        index
    }

    pub fn add_visited_block(&mut self, index: BlockIndex) {
        self.visited.push(index);
    }

    /// Parallel edges are kept. Panics if either block is unknown.
    pub fn add_edge(&mut self, origin: BlockIndex, dest: BlockIndex) {
        debug!(
            "{}: edge b{} -> b{}",
            self.name(),
            origin.index(),
            dest.index()
        );

        self.graph.add_edge(origin, dest, ());
    }

    /// Successors of `origin` in the order their edges were added.
    pub fn successors(&self, origin: BlockIndex) -> Vec<BlockIndex> {
        let mut edges = self
            .graph
            .edges_directed(origin, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target()))
            .collect::<Vec<_>>();

        edges.sort_unstable_by_key(|(id, _)| *id);

        edges.into_iter().map(|(_, target)| target).collect()
    }

    pub fn destinations(&self, origin: BlockIndex) -> Vec<&BasicBlock> {
        self.successors(origin)
            .into_iter()
            .filter_map(|dest| self.block(dest))
            .collect()
    }

    pub fn block(&self, index: BlockIndex) -> Option<&BasicBlock> {
        self.graph.node_weight(index)
    }

    pub fn block_mut(&mut self, index: BlockIndex) -> Option<&mut BasicBlock> {
        self.graph.node_weight_mut(index)
    }

    /// All blocks in the order they were added.
    pub fn basic_blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.graph
            .node_indices()
            .filter_map(move |index| self.graph.node_weight(index))
    }

    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn visited(&self) -> &[BlockIndex] {
        &self.visited
    }

    pub fn visited_blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.visited.iter().filter_map(move |index| self.block(*index))
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// A [`CfgManager`] behind a lock, for workers that explore disjoint
/// subtrees and merge their blocks into one graph.
#[derive(Clone, Debug, Default)]
pub struct SharedCfg(Arc<Mutex<CfgManager>>);

impl SharedCfg {
    pub fn new(cfg: CfgManager) -> Self {
        Self(Arc::new(Mutex::new(cfg)))
    }

    pub fn lock(&self) -> MutexGuard<'_, CfgManager> {
        self.0.lock()
    }

    pub fn add_basic_block(&self, block: BasicBlock) -> BlockIndex {
        self.lock().add_basic_block(block)
    }

    pub fn add_visited_block(&self, index: BlockIndex) {
        self.lock().add_visited_block(index)
    }

    pub fn add_edge(&self, origin: BlockIndex, dest: BlockIndex) {
        self.lock().add_edge(origin, dest)
    }

    /// Adds `successors` and their edges from `origin` under one lock, so
    /// the successors of one origin stay contiguous and ordered.
    pub fn add_successors(
        &self,
        origin: BlockIndex,
        successors: Vec<BasicBlock>,
    ) -> Vec<BlockIndex> {
        let mut cfg = self.lock();

        successors
            .into_iter()
            .map(|block| {
                let index = cfg.add_basic_block(block);
                cfg.add_edge(origin, index);
                index
            })
            .collect()
    }

    /// Gives the manager back once every other handle is gone.
    pub fn try_unwrap(self) -> Result<CfgManager, Self> {
        Arc::try_unwrap(self.0)
            .map(Mutex::into_inner)
            .map_err(Self)
    }
}
