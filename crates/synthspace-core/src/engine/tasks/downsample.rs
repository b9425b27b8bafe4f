use crate::core::chem::{ChemError, ChemToolkit};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::fragment::{ConnectorSet, FragmentRecord};
use crate::core::models::ids::{FragType, ReactionId};
use crate::core::store::{DownsampledStore, FragmentStore, FragmentStoreBuilder};
use crate::engine::config::DownsampleConfig;
use crate::engine::error::EngineError;
use crate::engine::stats::DownsampleCounts;
use crate::engine::utils::sampling::{frag_type_rng, shuffled_indices};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const ALGORITHM_NAME: &str = "k-centers";

#[derive(Debug, Clone, PartialEq)]
pub struct PositionDownsample {
    pub frag_type: FragType,
    /// Retained records in their original store order.
    pub retained: Vec<FragmentRecord>,
    pub counts: DownsampleCounts,
}

#[derive(Debug, Clone)]
pub struct DownsampleOutcome {
    pub store: DownsampledStore,
    pub per_reaction: BTreeMap<ReactionId, DownsampleCounts>,
    pub totals: DownsampleCounts,
}

struct Center {
    fingerprint: Fingerprint,
    connectors: ConnectorSet,
}

/// Greedy k-centers over one position.
///
/// Records are visited in an order shuffled by an RNG derived from the seed
/// and the frag type alone, so the result does not depend on which other
/// positions are processed or in what order. A record becomes a center when
/// fewer than `max_centers` centers exist and none of the comparable centers
/// reaches `min_similarity`; otherwise it is discarded.
#[instrument(skip_all, name = "downsample_position_task", fields(frag_type = %frag_type, records = records.len()))]
pub fn downsample_position<T: ChemToolkit>(
    toolkit: &T,
    frag_type: &FragType,
    records: &[FragmentRecord],
    config: &DownsampleConfig,
) -> PositionDownsample {
    let mut rng = frag_type_rng(config.random_seed, frag_type);
    let order = shuffled_indices(records.len(), &mut rng);

    let mut centers: Vec<Center> = Vec::new();
    let mut kept: Vec<usize> = Vec::new();
    let mut unparsable = 0;

    for idx in order {
        let record = &records[idx];
        let candidate = match prepare(toolkit, record) {
            Ok(c) => c,
            Err(e) => {
                warn!(fragment = %record.id, "Discarding unparsable record: {}", e);
                unparsable += 1;
                continue;
            }
        };
        if centers.len() >= config.max_centers {
            continue;
        }
        let covered = centers
            .iter()
            .filter(|c| !config.enforce_connector_equivalence || c.connectors == candidate.connectors)
            .any(|c| {
                toolkit.structural_similarity(&candidate.fingerprint, &c.fingerprint)
                    >= config.min_similarity
            });
        if !covered {
            centers.push(candidate);
            kept.push(idx);
        }
    }

    kept.sort_unstable();
    let retained: Vec<FragmentRecord> = kept.into_iter().map(|i| records[i].clone()).collect();
    let counts = DownsampleCounts {
        original: records.len(),
        retained: retained.len(),
        discarded: records.len() - retained.len(),
        unparsable,
    };
    debug!(retained = counts.retained, discarded = counts.discarded, "Position downsampled.");
    PositionDownsample {
        frag_type: frag_type.clone(),
        retained,
        counts,
    }
}

fn prepare<T: ChemToolkit>(toolkit: &T, record: &FragmentRecord) -> Result<Center, ChemError> {
    let molecule = toolkit.parse_structure(&record.structure)?;
    Ok(Center {
        fingerprint: toolkit.fingerprint(&molecule)?,
        connectors: toolkit.connectors(&molecule),
    })
}

/// Downsamples every position of a store independently.
#[instrument(skip_all, name = "downsample_task", fields(positions = store.frag_types().count(), max_centers = config.max_centers))]
pub fn run<T: ChemToolkit>(
    toolkit: &T,
    store: &FragmentStore,
    config: &DownsampleConfig,
) -> Result<DownsampleOutcome, EngineError> {
    let frag_types: Vec<FragType> = store.frag_types().collect();

    #[cfg(feature = "parallel")]
    let iter = frag_types.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = frag_types.iter();

    let results: Vec<PositionDownsample> = iter
        .map(|ft| downsample_position(toolkit, ft, store.records_of(ft), config))
        .collect();

    let mut builder = FragmentStoreBuilder::new();
    let mut per_reaction: BTreeMap<ReactionId, DownsampleCounts> = BTreeMap::new();
    let mut totals = DownsampleCounts::default();
    for result in results {
        builder.declare_position(&result.frag_type);
        for record in result.retained {
            builder.insert(record)?;
        }
        *per_reaction.entry(result.frag_type.reaction.clone()).or_default() += result.counts;
        totals += result.counts;
    }

    info!(
        original = totals.original,
        retained = totals.retained,
        discarded = totals.discarded,
        unparsable = totals.unparsable,
        "Downsampling finished."
    );
    Ok(DownsampleOutcome {
        store: DownsampledStore::new(builder.build(), ALGORITHM_NAME, config.min_similarity),
        per_reaction,
        totals,
    })
}
