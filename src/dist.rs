//! Distributed process role
//!
//! Rank detection belongs to the launcher. Writers only ask one question:
//! is this the primary process?

/// Position of the current process in a multi-process run
pub trait Distributed: Send + Sync {
    /// Global rank of this process
    fn rank(&self) -> usize;

    /// Number of participating processes
    fn world_size(&self) -> usize;

    /// Whether this is the primary (rank 0) process
    fn is_master(&self) -> bool {
        self.rank() == 0
    }
}

/// Plain single-process run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SingleProcess;

impl Distributed for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn world_size(&self) -> usize {
        1
    }
}

/// Fixed rank supplied by the launcher
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rank {
    pub rank: usize,
    pub world_size: usize,
}

impl Rank {
    pub fn new(rank: usize, world_size: usize) -> Self {
        Self { rank, world_size: world_size.max(rank + 1) }
    }
}

impl Distributed for Rank {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }
}
