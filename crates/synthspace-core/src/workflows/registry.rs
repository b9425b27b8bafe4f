use crate::core::chem::SubstructureToolkit;
use crate::core::index::FragmentIndex;
use crate::core::models::fragment::FragmentRecord;
use crate::core::store::FragmentStore;
use crate::engine::config::SplitSearchConfig;
use crate::engine::error::EngineError;
use crate::engine::tasks::split_match::{self, SplitSearchOutcome};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    pub record: FragmentRecord,
    pub similarity: f64,
}

/// A search service living outside this process.
pub trait RemoteSearch: Send + Sync {
    fn search(&self, query: &str) -> Result<Vec<SimilarityHit>, String>;
}

/// The kinds of search a registry can route a query to.
#[derive(Clone)]
pub enum SearchProvider {
    /// Split matching of the query against the synthons.
    Substructure(SplitSearchConfig),
    /// Fingerprint similarity of the query to individual synthons.
    Similarity { min_similarity: f64, max_results: usize },
    /// Forwarding to an application-supplied service.
    RemoteProxy(Arc<dyn RemoteSearch>),
}

impl fmt::Debug for SearchProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchProvider::Substructure(config) => f.debug_tuple("Substructure").field(config).finish(),
            SearchProvider::Similarity {
                min_similarity,
                max_results,
            } => f
                .debug_struct("Similarity")
                .field("min_similarity", min_similarity)
                .field("max_results", max_results)
                .finish(),
            SearchProvider::RemoteProxy(_) => f.write_str("RemoteProxy"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Substructure(SplitSearchOutcome),
    Similarity(Vec<SimilarityHit>),
    Remote(Vec<SimilarityHit>),
}

/// Named search providers over one store.
///
/// The registry is an ordinary value: callers build it, register providers
/// and pass it to whatever handles incoming queries.
pub struct SearchRegistry<'a, T: SubstructureToolkit> {
    toolkit: &'a T,
    store: &'a FragmentStore,
    index: FragmentIndex<T::Molecule>,
    providers: BTreeMap<String, SearchProvider>,
}

impl<'a, T: SubstructureToolkit> SearchRegistry<'a, T> {
    pub fn new(toolkit: &'a T, store: &'a FragmentStore) -> Self {
        Self {
            toolkit,
            store,
            index: FragmentIndex::build(toolkit, store),
            providers: BTreeMap::new(),
        }
    }

    /// Registers `provider` under `name`, returning the one it replaces.
    pub fn register(&mut self, name: impl Into<String>, provider: SearchProvider) -> Option<SearchProvider> {
        self.providers.insert(name.into(), provider)
    }

    pub fn unregister(&mut self, name: &str) -> Option<SearchProvider> {
        self.providers.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    #[instrument(skip_all, name = "registry_search", fields(provider = name))]
    pub fn search(&self, name: &str, query: &str) -> Result<SearchOutcome, EngineError> {
        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| EngineError::UnknownProvider(name.to_string()))?;
        match provider {
            SearchProvider::Substructure(config) => {
                let molecule = self
                    .toolkit
                    .parse_structure(query)
                    .map_err(|source| EngineError::Query { source })?;
                Ok(SearchOutcome::Substructure(split_match::run(
                    self.toolkit,
                    &molecule,
                    self.store,
                    &self.index,
                    config,
                )))
            }
            SearchProvider::Similarity {
                min_similarity,
                max_results,
            } => self
                .similarity_search(query, *min_similarity, *max_results)
                .map(SearchOutcome::Similarity),
            SearchProvider::RemoteProxy(remote) => {
                debug!("Forwarding query to remote provider.");
                remote
                    .search(query)
                    .map(SearchOutcome::Remote)
                    .map_err(EngineError::Remote)
            }
        }
    }

    fn similarity_search(
        &self,
        query: &str,
        min_similarity: f64,
        max_results: usize,
    ) -> Result<Vec<SimilarityHit>, EngineError> {
        let molecule = self
            .toolkit
            .parse_structure(query)
            .map_err(|source| EngineError::Query { source })?;
        let fingerprint = self
            .toolkit
            .fingerprint(&molecule)
            .map_err(|source| EngineError::Query { source })?;

        let mut hits: Vec<SimilarityHit> = self
            .index
            .iter()
            .flat_map(|(_, position)| position.records.iter())
            .filter_map(|entry| {
                let similarity = self.toolkit.structural_similarity(&fingerprint, &entry.fingerprint);
                (similarity >= min_similarity).then(|| SimilarityHit {
                    record: entry.record.clone(),
                    similarity,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(max_results);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SplitSearchConfigBuilder;
    use crate::testing::{ChainToolkit, store};

    struct FixedRemote(Result<Vec<SimilarityHit>, String>);

    impl RemoteSearch for FixedRemote {
        fn search(&self, _query: &str) -> Result<Vec<SimilarityHit>, String> {
            self.0.clone()
        }
    }

    fn space() -> FragmentStore {
        store(&[
            ("R1", 0, &["1CO", "1CC"]),
            ("R1", 1, &["1SN", "1PP"]),
        ])
    }

    #[test]
    fn providers_are_dispatched_by_name() {
        let toolkit = ChainToolkit;
        let s = space();
        let mut registry = SearchRegistry::new(&toolkit, &s);
        registry.register(
            "split",
            SearchProvider::Substructure(
                SplitSearchConfigBuilder::new()
                    .max_splits(1)
                    .max_combinatorial_hits(10)
                    .build()
                    .unwrap(),
            ),
        );
        registry.register(
            "similar",
            SearchProvider::Similarity {
                min_similarity: 0.2,
                max_results: 2,
            },
        );
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["similar", "split"]);

        match registry.search("split", "COSN").unwrap() {
            SearchOutcome::Substructure(outcome) => assert_eq!(outcome.hits.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match registry.search("similar", "CC").unwrap() {
            SearchOutcome::Similarity(hits) => {
                assert_eq!(hits[0].record.id.as_str(), "R1-0-1");
                assert!((hits[0].similarity - 1.0).abs() < 1e-9);
                assert!(hits.len() <= 2);
                assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn unknown_providers_are_an_error() {
        let toolkit = ChainToolkit;
        let s = space();
        let registry = SearchRegistry::new(&toolkit, &s);
        assert!(matches!(
            registry.search("missing", "CC"),
            Err(EngineError::UnknownProvider(name)) if name == "missing"
        ));
    }

    #[test]
    fn remote_providers_forward_results_and_failures() {
        let toolkit = ChainToolkit;
        let s = space();
        let mut registry = SearchRegistry::new(&toolkit, &s);
        let hit = SimilarityHit {
            record: s.records(&"R1".into(), 0)[0].clone(),
            similarity: 0.9,
        };
        registry.register("remote", SearchProvider::RemoteProxy(Arc::new(FixedRemote(Ok(vec![hit.clone()])))));
        registry.register(
            "down",
            SearchProvider::RemoteProxy(Arc::new(FixedRemote(Err("timeout".to_string())))),
        );

        match registry.search("remote", "CC").unwrap() {
            SearchOutcome::Remote(hits) => assert_eq!(hits, vec![hit]),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(registry.search("down", "CC"), Err(EngineError::Remote(m)) if m == "timeout"));
        assert!(registry.unregister("down").is_some());
    }

    #[test]
    fn unparsable_queries_are_rejected() {
        let toolkit = ChainToolkit;
        let s = space();
        let mut registry = SearchRegistry::new(&toolkit, &s);
        registry.register(
            "similar",
            SearchProvider::Similarity {
                min_similarity: 0.0,
                max_results: 5,
            },
        );
        assert!(matches!(registry.search("similar", "not a chain"), Err(EngineError::Query { .. })));
    }
}
