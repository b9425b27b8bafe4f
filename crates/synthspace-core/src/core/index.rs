use crate::core::chem::ChemToolkit;
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::fragment::FragmentRecord;
use crate::core::models::ids::FragType;
use crate::core::store::FragmentStore;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A record prepared for substructure screening.
#[derive(Debug, Clone)]
pub struct IndexedRecord<M> {
    pub record: FragmentRecord,
    pub molecule: M,
    pub fingerprint: Fingerprint,
    pub connector_count: usize,
}

/// Prepared records of one position plus the union of their fingerprints.
#[derive(Debug, Clone)]
pub struct PositionIndex<M> {
    pub records: Vec<IndexedRecord<M>>,
    /// A query fragment whose bits are not all present here cannot match any
    /// record of the position.
    pub union: Fingerprint,
}

/// Parsed records and fingerprints for every position of a store.
///
/// Built once and shared read-only by every search against the same store.
/// Records that fail to parse or fingerprint are logged and left out.
#[derive(Debug, Clone)]
pub struct FragmentIndex<M> {
    positions: BTreeMap<FragType, PositionIndex<M>>,
    skipped: usize,
}

impl<M: Clone + Send + Sync> FragmentIndex<M> {
    #[instrument(skip_all, name = "fragment_index_build", fields(records = store.record_count()))]
    pub fn build<T>(toolkit: &T, store: &FragmentStore) -> Self
    where
        T: ChemToolkit<Molecule = M>,
    {
        let frag_types: Vec<FragType> = store.frag_types().collect();

        #[cfg(feature = "parallel")]
        let iter = frag_types.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = frag_types.iter();

        let built: Vec<(FragType, PositionIndex<M>, usize)> = iter
            .map(|ft| {
                let (index, skipped) = index_position(toolkit, store.records_of(ft));
                (ft.clone(), index, skipped)
            })
            .collect();

        let mut positions = BTreeMap::new();
        let mut skipped = 0;
        for (ft, index, n) in built {
            skipped += n;
            positions.insert(ft, index);
        }
        info!(positions = positions.len(), skipped, "Fragment index ready.");
        Self { positions, skipped }
    }

    pub fn position(&self, frag_type: &FragType) -> Option<&PositionIndex<M>> {
        self.positions.get(frag_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FragType, &PositionIndex<M>)> {
        self.positions.iter()
    }

    /// Records left out because the toolkit could not process them.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn index_position<T: ChemToolkit>(
    toolkit: &T,
    records: &[FragmentRecord],
) -> (PositionIndex<T::Molecule>, usize) {
    let mut prepared = Vec::with_capacity(records.len());
    let mut union: Option<Fingerprint> = None;
    let mut skipped = 0;

    for record in records {
        let prepared_record = toolkit.parse_structure(&record.structure).and_then(|molecule| {
            let fingerprint = toolkit.fingerprint(&molecule)?;
            let connector_count = toolkit.connectors(&molecule).len();
            Ok(IndexedRecord {
                record: record.clone(),
                molecule,
                fingerprint,
                connector_count,
            })
        });
        match prepared_record {
            Ok(entry) => {
                match union.as_mut() {
                    Some(u) => u.union_with(&entry.fingerprint),
                    None => union = Some(entry.fingerprint.clone()),
                }
                prepared.push(entry);
            }
            Err(e) => {
                warn!(fragment = %record.id, frag_type = %record.frag_type, "Leaving record out of the index: {}", e);
                skipped += 1;
            }
        }
    }

    (
        PositionIndex {
            records: prepared,
            union: union.unwrap_or_else(|| Fingerprint::with_bits(0)),
        },
        skipped,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ChainToolkit, store};

    #[test]
    fn index_covers_every_position_and_skips_bad_records() {
        let s = store(&[("R1", 0, &["1CC", "1Z", "1C!"]), ("R1", 1, &["1NO"])]);
        let index = FragmentIndex::build(&ChainToolkit, &s);
        assert_eq!(index.iter().count(), 2);
        assert_eq!(index.skipped(), 2);
        let first = index.position(&FragType::new("R1", 0)).unwrap();
        assert_eq!(first.records.len(), 1);
        assert_eq!(first.records[0].connector_count, 1);
    }

    #[test]
    fn union_fingerprint_contains_every_record() {
        let s = store(&[("R1", 0, &["1CN", "1OS"])]);
        let index = FragmentIndex::build(&ChainToolkit, &s);
        let position = index.position(&FragType::new("R1", 0)).unwrap();
        for entry in &position.records {
            assert!(entry.fingerprint.is_subset_of(&position.union));
        }
    }
}
