//! Extraction driver.
//!
//! Runs a pairing strategy over a finished tree and feeds the resulting work
//! units to a [`SegmentationEngine`].
//!
//! ## Algorithm
//!
//! 1. Plan the work units (pairing errors abort before any engine call)
//! 2. Call the engine once per unit, strictly in order
//! 3. Unit volumes are OR-merged voxel-wise and one surface is recomputed
//!    from the merged volume, even when there is a single unit
//! 4. [`StrategyKind::AllInOne`] issues one aggregate request and returns the
//!    engine output as is
//!
//! An engine failure aborts the run. Work already issued is not undone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ConfigError, EngineParameters};
use crate::export::{ExportError, TopologySnapshot};
use crate::pairing::{PairingError, SegmentPairingStrategy, StrategyKind};
use crate::tree::BranchTree;
use crate::types::{LabelVolume, Position, PositionMap, VolumeError, WorkUnit};

/// Volume and surface produced by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation<S> {
    /// Binary label volume.
    pub volume: LabelVolume,
    /// Surface extracted from the volume.
    pub surface: S,
}

/// External volumetric segmentation engine.
pub trait SegmentationEngine {
    /// Surface representation produced by the engine.
    type Surface;
    /// Engine failure.
    type Error: std::error::Error + 'static;

    /// Segment the vessel grown from `seeds` and bounded by `ends`.
    fn extract(
        &mut self,
        seeds: &[Position],
        ends: &[Position],
        params: &EngineParameters,
    ) -> Result<Segmentation<Self::Surface>, Self::Error>;

    /// Recompute a surface from a label volume.
    fn surface_from_volume(
        &mut self,
        volume: &LabelVolume,
        params: &EngineParameters,
    ) -> Result<Self::Surface, Self::Error>;
}

/// Error type for extraction runs.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError<E> {
    /// Work unit planning failed.
    #[error("Pairing error: {0}")]
    Pairing(#[from] PairingError),

    /// The engine failed on a work unit.
    #[error("Engine failed on work unit {unit}: {source}")]
    Engine {
        /// Index of the failing unit.
        unit: usize,
        /// Engine error.
        #[source]
        source: E,
    },

    /// The engine failed to recompute the merged surface.
    #[error("Engine failed on merged surface: {0}")]
    Surface(#[source] E),

    /// The strategy produced nothing to extract.
    #[error("No work units to extract")]
    NoWorkUnits,

    /// Engine volumes could not be merged.
    #[error("Volume error: {0}")]
    VolumeShape(#[from] VolumeError),

    /// Parameters could not be hashed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Topology could not be fingerprinted.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] ExportError),
}

/// Provenance of one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Unique run id.
    pub run_id: Uuid,
    /// Strategy used to plan the units.
    pub strategy: StrategyKind,
    /// Number of engine calls for work units.
    pub unit_count: usize,
    /// Whether results were merged and the surface recomputed.
    pub merged: bool,
    /// Hash of the engine parameters.
    pub params_hash: String,
    /// Snapshot id of the tree and positions the units were planned from.
    pub topology_snapshot_id: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Extraction<S> {
    /// Merged segmentation.
    pub segmentation: Segmentation<S>,
    /// Run provenance.
    pub report: ExtractionReport,
}

/// Drives a segmentation engine over the work units of a tree.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    params: EngineParameters,
}

impl Extractor {
    /// Create an extractor using `params` for every engine call.
    pub fn new(params: EngineParameters) -> Self {
        Self { params }
    }

    /// Engine parameters.
    pub fn params(&self) -> &EngineParameters {
        &self.params
    }

    /// Work units that would be sent to the engine. Units without seeds or
    /// without ends are dropped.
    pub fn plan(
        &self,
        strategy: &dyn SegmentPairingStrategy,
        tree: &BranchTree,
        positions: &PositionMap,
    ) -> Result<Vec<WorkUnit>, PairingError> {
        let units = strategy.work_units(tree, positions)?;
        let planned = units.len();
        let units: Vec<WorkUnit> = units.into_iter().filter(|u| !u.is_empty()).collect();
        if units.len() != planned {
            tracing::debug!(dropped = planned - units.len(), "dropped empty work units");
        }
        Ok(units)
    }

    /// Plan and run the extraction.
    pub fn run<G: SegmentationEngine>(
        &self,
        strategy: &dyn SegmentPairingStrategy,
        tree: &BranchTree,
        positions: &PositionMap,
        engine: &mut G,
    ) -> Result<Extraction<G::Surface>, ExtractionError<G::Error>> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let kind = strategy.kind();

        let units = self.plan(strategy, tree, positions)?;
        if units.is_empty() {
            return Err(ExtractionError::NoWorkUnits);
        }
        let params_hash = self.params.params_hash()?;
        let snapshot = TopologySnapshot::compute_with_positions(tree, positions)?;

        tracing::info!(
            run_id = %run_id,
            strategy = %kind,
            units = units.len(),
            params_hash = %params_hash,
            "extraction started"
        );

        let mut results = Vec::with_capacity(units.len());
        for (index, unit) in units.iter().enumerate() {
            tracing::debug!(
                run_id = %run_id,
                unit = index,
                seeds = unit.seeds.len(),
                ends = unit.ends.len(),
                "extracting work unit"
            );
            let segmentation = engine
                .extract(&unit.seeds, &unit.ends, &self.params)
                .map_err(|source| {
                    tracing::warn!(run_id = %run_id, unit = index, error = %source, "engine failed");
                    ExtractionError::Engine { unit: index, source }
                })?;
            results.push(segmentation);
        }

        let unit_count = results.len();
        let merged = kind != StrategyKind::AllInOne || unit_count > 1;
        let segmentation = self.merge(results, merged, engine)?;

        let report = ExtractionReport {
            run_id,
            strategy: kind,
            unit_count,
            merged,
            params_hash,
            topology_snapshot_id: snapshot.snapshot_id,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            run_id = %run_id,
            units = unit_count,
            foreground = segmentation.volume.count_foreground(),
            "extraction finished"
        );
        Ok(Extraction { segmentation, report })
    }

    /// OR-merge the unit volumes and recompute the surface once. Without
    /// `recompute` the single result is passed through.
    fn merge<G: SegmentationEngine>(
        &self,
        results: Vec<Segmentation<G::Surface>>,
        recompute: bool,
        engine: &mut G,
    ) -> Result<Segmentation<G::Surface>, ExtractionError<G::Error>> {
        let mut results = results.into_iter();
        let Some(first) = results.next() else {
            return Err(ExtractionError::NoWorkUnits);
        };
        if !recompute {
            return Ok(first);
        }

        let mut volume = first.volume;
        for segmentation in results {
            volume.merge_or(&segmentation.volume)?;
        }
        let surface = engine
            .surface_from_volume(&volume, &self.params)
            .map_err(ExtractionError::Surface)?;
        Ok(Segmentation { volume, surface })
    }
}
