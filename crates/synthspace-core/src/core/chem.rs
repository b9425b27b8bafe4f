//! Capability interfaces to the cheminformatics toolkit.
//!
//! The engine never inspects molecules itself. Every chemistry primitive it
//! needs (parsing, fingerprints, fragment assembly, conformers, shape
//! descriptors, substructure matching and query splitting) is requested
//! through the traits in this module, so any conforming toolkit can be
//! plugged in without touching the search and optimization algorithms.
//!
//! All toolkit failures surface as [`ChemError`]. The engine treats every one
//! of them as recoverable: the affected record, attempt or candidate is
//! skipped and sibling work continues.

use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::fragment::ConnectorSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChemError {
    #[error("Failed to parse structure '{code}': {reason}")]
    Parse { code: String, reason: String },

    #[error("Fingerprint computation failed: {0}")]
    Fingerprint(String),

    #[error("Substructure match failed: {0}")]
    Match(String),

    #[error("Failed to split query structure: {0}")]
    Split(String),

    #[error("Fragment assembly failed: {0}")]
    Assembly(String),

    #[error("Conformer generation failed: {0}")]
    Conformer(String),

    #[error("Shape descriptor computation failed: {0}")]
    Descriptor(String),
}

/// Core chemistry operations required by the downsampler, seed finder and
/// beam optimizer.
///
/// Implementations must be shareable across worker threads; the engine calls
/// them concurrently from independent jobs without additional locking.
pub trait ChemToolkit: Send + Sync {
    /// Parsed, toolkit-native molecule.
    type Molecule: Clone + Send + Sync;
    /// A generated set of 3D conformers for one molecule.
    type Conformers: Send;
    /// A shape descriptor derived from a conformer set.
    type Descriptor: Clone + Send + Sync;

    fn parse_structure(&self, code: &str) -> Result<Self::Molecule, ChemError>;

    /// Canonical structure code; identical molecules must yield identical codes.
    fn structure_code(&self, molecule: &Self::Molecule) -> String;

    fn fingerprint(&self, molecule: &Self::Molecule) -> Result<Fingerprint, ChemError>;

    /// Structural similarity between two fingerprints, in `[0, 1]`.
    fn structural_similarity(&self, a: &Fingerprint, b: &Fingerprint) -> f64 {
        a.tanimoto(b)
    }

    /// Number of heavy atoms, excluding connector markers.
    fn atom_count(&self, molecule: &Self::Molecule) -> usize;

    /// Connector configuration of a synthon.
    fn connectors(&self, molecule: &Self::Molecule) -> ConnectorSet;

    fn count_rotatable_bonds(&self, molecule: &Self::Molecule) -> usize;

    /// Joins one synthon per reaction position into a product.
    ///
    /// Fails with [`ChemError::Assembly`] when the connectors do not pair up.
    fn assemble_fragments(
        &self,
        fragments: &[&Self::Molecule],
    ) -> Result<Self::Molecule, ChemError>;

    /// Generates up to `count` conformers. The returned set may be empty.
    fn generate_conformers(
        &self,
        molecule: &Self::Molecule,
        count: usize,
    ) -> Result<Self::Conformers, ChemError>;

    fn conformer_count(&self, conformers: &Self::Conformers) -> usize;

    fn shape_descriptor(
        &self,
        conformers: &Self::Conformers,
    ) -> Result<Self::Descriptor, ChemError>;

    /// Shape similarity between two descriptors, in `[0, 1]`.
    fn shape_similarity(&self, a: &Self::Descriptor, b: &Self::Descriptor) -> f64;
}

/// A connected piece of a query produced by cutting a set of its bonds.
#[derive(Debug, Clone)]
pub struct QueryFragment<M> {
    pub molecule: M,
    /// Query atom indices contained in this piece.
    pub query_atoms: Vec<usize>,
    /// Cut bonds adjacent to this piece; each one became a connector.
    pub cut_bonds: Vec<usize>,
}

impl<M> QueryFragment<M> {
    pub fn connector_count(&self) -> usize {
        self.cut_bonds.len()
    }
}

/// Additional operations needed by the split matcher.
pub trait SubstructureToolkit: ChemToolkit {
    /// Bond indices of the query that may be cut (typically acyclic single bonds).
    fn cuttable_bonds(&self, query: &Self::Molecule) -> Vec<usize>;

    /// Cuts the given bonds and returns the resulting connected pieces.
    fn split(
        &self,
        query: &Self::Molecule,
        cuts: &[usize],
    ) -> Result<Vec<QueryFragment<Self::Molecule>>, ChemError>;

    /// Topological distance in bonds between two bonds of the query, or `None`
    /// when they lie in different components.
    fn bond_distance(&self, query: &Self::Molecule, a: usize, b: usize) -> Option<usize>;

    /// Exact substructure test of `fragment` within `target`. Connector
    /// markers on the fragment match any atom or connector of the target.
    fn is_substructure(
        &self,
        fragment: &Self::Molecule,
        target: &Self::Molecule,
    ) -> Result<bool, ChemError>;
}

/// Runs the conformer → descriptor pipeline for one molecule.
///
/// An empty conformer set is reported as [`ChemError::Conformer`].
pub fn describe_shape<T: ChemToolkit>(
    toolkit: &T,
    molecule: &T::Molecule,
    conformers: usize,
) -> Result<T::Descriptor, ChemError> {
    let set = toolkit.generate_conformers(molecule, conformers)?;
    if toolkit.conformer_count(&set) == 0 {
        return Err(ChemError::Conformer(
            "toolkit produced no conformers".to_string(),
        ));
    }
    toolkit.shape_descriptor(&set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ChainToolkit;

    #[test]
    fn describe_shape_rejects_empty_conformer_sets() {
        let toolkit = ChainToolkit::default();
        let molecule = toolkit.parse_structure("CCY").unwrap();
        let result = describe_shape(&toolkit, &molecule, 4);
        assert!(matches!(result, Err(ChemError::Conformer(_))));
    }

    #[test]
    fn describe_shape_propagates_generation_failures() {
        let toolkit = ChainToolkit::default();
        let molecule = toolkit.parse_structure("CXC").unwrap();
        assert!(matches!(
            describe_shape(&toolkit, &molecule, 4),
            Err(ChemError::Conformer(_))
        ));
    }

    #[test]
    fn describe_shape_succeeds_for_plain_molecules() {
        let toolkit = ChainToolkit::default();
        let molecule = toolkit.parse_structure("CCNO").unwrap();
        assert!(describe_shape(&toolkit, &molecule, 4).is_ok());
    }
}
