//! A deterministic toy chemistry used by the unit tests.
//!
//! Molecules are linear chains written as strings: letters are atoms, digits
//! `1`-`9` are labelled connectors and `*` marks a connector created by
//! cutting a query bond. Bond `i` joins atoms `i` and `i + 1`.
//!
//! A few letters trigger failures so error paths can be exercised:
//! `Z` breaks fingerprinting, `Q` breaks substructure matching, `X` breaks
//! conformer generation and `Y` yields an empty conformer set.

use crate::core::chem::{ChemError, ChemToolkit, QueryFragment, SubstructureToolkit};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::fragment::{ConnectorSet, FragmentRecord};
use crate::core::models::ids::FragType;
use crate::core::store::{FragmentStore, FragmentStoreBuilder};
use std::collections::HashMap;

const FP_BITS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMolecule {
    pub atoms: Vec<char>,
}

impl ChainMolecule {
    fn letters(&self) -> Vec<char> {
        self.atoms
            .iter()
            .copied()
            .filter(|c| c.is_ascii_alphabetic())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ChainConformers {
    histogram: [f64; 26],
    count: usize,
}

#[derive(Debug, Default, Clone)]
pub struct ChainToolkit;

fn histogram(letters: &[char]) -> [f64; 26] {
    let mut h = [0.0; 26];
    for c in letters {
        let idx = (c.to_ascii_uppercase() as u8 - b'A') as usize;
        h[idx] += 1.0;
    }
    h
}

impl ChemToolkit for ChainToolkit {
    type Molecule = ChainMolecule;
    type Conformers = ChainConformers;
    type Descriptor = [f64; 26];

    fn parse_structure(&self, code: &str) -> Result<ChainMolecule, ChemError> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '*') {
            return Err(ChemError::Parse {
                code: code.to_string(),
                reason: "not a chain".to_string(),
            });
        }
        Ok(ChainMolecule {
            atoms: code.chars().collect(),
        })
    }

    fn structure_code(&self, molecule: &ChainMolecule) -> String {
        molecule.atoms.iter().collect()
    }

    fn fingerprint(&self, molecule: &ChainMolecule) -> Result<Fingerprint, ChemError> {
        let letters = molecule.letters();
        if letters.contains(&'Z') {
            return Err(ChemError::Fingerprint("Z atoms are unsupported".to_string()));
        }
        let mut fp = Fingerprint::with_bits(FP_BITS);
        for &c in &letters {
            fp.set(c as usize);
        }
        for pair in letters.windows(2) {
            fp.set(128 + (pair[0] as usize * 31 + pair[1] as usize) % 128);
        }
        Ok(fp)
    }

    fn atom_count(&self, molecule: &ChainMolecule) -> usize {
        molecule.letters().len()
    }

    fn connectors(&self, molecule: &ChainMolecule) -> ConnectorSet {
        ConnectorSet::new(
            molecule
                .atoms
                .iter()
                .filter_map(|&c| match c {
                    '*' => Some(0),
                    d if d.is_ascii_digit() => Some(d as u8 - b'0'),
                    _ => None,
                })
                .collect(),
        )
    }

    fn count_rotatable_bonds(&self, molecule: &ChainMolecule) -> usize {
        molecule.letters().len().saturating_sub(2)
    }

    fn assemble_fragments(&self, fragments: &[&ChainMolecule]) -> Result<ChainMolecule, ChemError> {
        if fragments.is_empty() {
            return Err(ChemError::Assembly("no fragments".to_string()));
        }
        let mut label_counts: HashMap<char, usize> = HashMap::new();
        for fragment in fragments {
            for &c in fragment.atoms.iter().filter(|c| c.is_ascii_digit()) {
                *label_counts.entry(c).or_default() += 1;
            }
        }
        if fragments.len() > 1
            && (label_counts.is_empty() || label_counts.values().any(|&n| n != 2))
        {
            return Err(ChemError::Assembly("connectors do not pair up".to_string()));
        }
        Ok(ChainMolecule {
            atoms: fragments.iter().flat_map(|f| f.letters()).collect(),
        })
    }

    fn generate_conformers(
        &self,
        molecule: &ChainMolecule,
        count: usize,
    ) -> Result<ChainConformers, ChemError> {
        let letters = molecule.letters();
        if letters.contains(&'X') {
            return Err(ChemError::Conformer("X atoms cannot be embedded".to_string()));
        }
        let count = if letters.contains(&'Y') {
            0
        } else {
            count.min(letters.len().max(1))
        };
        Ok(ChainConformers {
            histogram: histogram(&letters),
            count,
        })
    }

    fn conformer_count(&self, conformers: &ChainConformers) -> usize {
        conformers.count
    }

    fn shape_descriptor(&self, conformers: &ChainConformers) -> Result<[f64; 26], ChemError> {
        if conformers.count == 0 {
            return Err(ChemError::Descriptor("empty conformer set".to_string()));
        }
        Ok(conformers.histogram)
    }

    fn shape_similarity(&self, a: &[f64; 26], b: &[f64; 26]) -> f64 {
        let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
        if na == 0.0 || nb == 0.0 {
            0.0
        } else {
            (dot / (na * nb)).clamp(0.0, 1.0)
        }
    }
}

impl SubstructureToolkit for ChainToolkit {
    fn cuttable_bonds(&self, query: &ChainMolecule) -> Vec<usize> {
        (0..query.atoms.len().saturating_sub(1))
            .filter(|&i| query.atoms[i].is_ascii_alphabetic() && query.atoms[i + 1].is_ascii_alphabetic())
            .collect()
    }

    fn split(
        &self,
        query: &ChainMolecule,
        cuts: &[usize],
    ) -> Result<Vec<QueryFragment<ChainMolecule>>, ChemError> {
        let mut cuts = cuts.to_vec();
        cuts.sort_unstable();
        if cuts.iter().any(|&c| c + 1 >= query.atoms.len()) {
            return Err(ChemError::Split("cut bond out of range".to_string()));
        }
        let mut pieces = Vec::with_capacity(cuts.len() + 1);
        let mut start = 0;
        let mut left_cut: Option<usize> = None;
        for end_cut in cuts.iter().copied().map(Some).chain(std::iter::once(None)) {
            let end = end_cut.map_or(query.atoms.len() - 1, |c| c);
            let mut atoms = Vec::new();
            let mut cut_bonds = Vec::new();
            if let Some(c) = left_cut {
                atoms.push('*');
                cut_bonds.push(c);
            }
            atoms.extend_from_slice(&query.atoms[start..=end]);
            if let Some(c) = end_cut {
                atoms.push('*');
                cut_bonds.push(c);
            }
            pieces.push(QueryFragment {
                molecule: ChainMolecule { atoms },
                query_atoms: (start..=end).collect(),
                cut_bonds,
            });
            start = end + 1;
            left_cut = end_cut;
        }
        Ok(pieces)
    }

    fn bond_distance(&self, _query: &ChainMolecule, a: usize, b: usize) -> Option<usize> {
        Some(a.abs_diff(b))
    }

    fn is_substructure(
        &self,
        fragment: &ChainMolecule,
        target: &ChainMolecule,
    ) -> Result<bool, ChemError> {
        let needle: String = fragment.letters().into_iter().collect();
        if needle.contains('Q') {
            return Err(ChemError::Match("Q atoms cannot be matched".to_string()));
        }
        let haystack: String = target.letters().into_iter().collect();
        Ok(haystack.contains(&needle))
    }
}

/// Builds a store from `(reaction, position, [structure codes])` triples.
/// Fragment ids are `<reaction>-<position>-<index>`.
pub fn store(layout: &[(&str, usize, &[&str])]) -> FragmentStore {
    let mut builder = FragmentStoreBuilder::new();
    for &(reaction, position, codes) in layout {
        for (i, code) in codes.iter().enumerate() {
            let ft = FragType::new(reaction, position);
            builder
                .insert(FragmentRecord::new(
                    ft,
                    format!("{reaction}-{position}-{i}").as_str(),
                    *code,
                ))
                .unwrap();
        }
    }
    builder.build()
}
