//! Shared wizard session.
//!
//! A host that touches the tree or the points from more than one thread
//! holds the whole wizard behind one lock. The tree and its point source are
//! always read and written together, so there is a single lock per tree and
//! no lock ordering to get wrong.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::export::{to_adjacency_list, AdjacencyList, ExportError, TopologySnapshot};
use crate::pairing::{PairingError, SegmentPairingStrategy};
use crate::points::PointSource;
use crate::types::WorkUnit;
use crate::wizard::{PlacementWizard, WizardCommand, WizardError};

/// A placement wizard shared between threads.
pub struct SharedWizard<P: PointSource> {
    inner: Arc<Mutex<PlacementWizard<P>>>,
}

impl<P: PointSource> Clone for SharedWizard<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: PointSource> SharedWizard<P> {
    /// Wrap a wizard.
    pub fn new(wizard: PlacementWizard<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(wizard)),
        }
    }

    /// Lock the session.
    pub fn lock(&self) -> MutexGuard<'_, PlacementWizard<P>> {
        self.inner.lock()
    }

    /// Run `f` with the session locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut PlacementWizard<P>) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Dispatch a command under the lock.
    pub fn handle(&self, command: WizardCommand) {
        self.inner.lock().handle(command);
    }

    /// Forward a point-added notification under the lock.
    pub fn on_point_added(&self) -> Result<(), WizardError> {
        self.inner.lock().on_point_added()
    }

    /// Adjacency list of the current tree.
    pub fn adjacency_list(&self) -> AdjacencyList {
        to_adjacency_list(self.inner.lock().tree())
    }

    /// Fingerprint of the current tree and positions, taken under one lock.
    pub fn snapshot(&self) -> Result<TopologySnapshot, ExportError> {
        let guard = self.inner.lock();
        TopologySnapshot::compute_with_positions(guard.tree(), &guard.points().positions())
    }

    /// Plan work units from a consistent view of tree and positions.
    pub fn work_units(&self, strategy: &dyn SegmentPairingStrategy) -> Result<Vec<WorkUnit>, PairingError> {
        let guard = self.inner.lock();
        strategy.work_units(guard.tree(), &guard.points().positions())
    }

    /// Number of handles to this session.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::OnePerBranch;
    use crate::points::InMemoryPointSource;
    use crate::template::{VeinId, VesselTemplate};
    use crate::types::{NodeId, Position};
    use std::thread;

    #[test]
    fn test_shared_placement_across_threads() {
        let wizard = PlacementWizard::new(InMemoryPointSource::new(), VesselTemplate::Portal).unwrap();
        let shared = SharedWizard::new(wizard);
        shared.handle(WizardCommand::RequestSelect(NodeId::new(VeinId::PORTAL_VEIN_ROOT)));

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared.with(|w| w.place_point(Position::new(i as f64, 0.0, 0.0)))
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }

        let placed = shared.lock().tree().placed_node_list().len();
        assert_eq!(placed, 4);
        assert_eq!(shared.handle_count(), 1);
        assert!(shared.snapshot().unwrap().position_hash.is_some());
        assert!(matches!(
            shared.work_units(&OnePerBranch),
            Err(PairingError::MissingPosition(_))
        ));
        assert_eq!(shared.adjacency_list().len(), 16);
    }
}
