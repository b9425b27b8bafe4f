use super::ids::{FragType, FragmentId, ReactionId};

/// A single synthon of the combinatorial space.
///
/// Records are immutable once created and live as long as the store that owns
/// them. The structure code is opaque to the engine; only the chemistry
/// toolkit interprets it.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentRecord {
    pub frag_type: FragType,
    pub id: FragmentId,
    pub structure: String,
    pub price: Option<f64>,
}

impl FragmentRecord {
    pub fn new(
        frag_type: FragType,
        id: impl Into<FragmentId>,
        structure: impl Into<String>,
    ) -> Self {
        Self {
            frag_type,
            id: id.into(),
            structure: structure.into(),
            price: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    #[inline]
    pub fn reaction(&self) -> &ReactionId {
        &self.frag_type.reaction
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.frag_type.position
    }
}

/// The set of connector labels carried by a fragment, kept sorted so that two
/// fragments with the same reactive sites compare equal regardless of atom order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorSet(Vec<u8>);

impl ConnectorSet {
    pub fn new(mut labels: Vec<u8>) -> Self {
        labels.sort_unstable();
        Self(labels)
    }

    pub fn labels(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_sets_ignore_label_order() {
        assert_eq!(ConnectorSet::new(vec![2, 1]), ConnectorSet::new(vec![1, 2]));
        assert_ne!(ConnectorSet::new(vec![1]), ConnectorSet::new(vec![1, 1]));
    }

    #[test]
    fn record_exposes_reaction_and_position() {
        let record = FragmentRecord::new(FragType::new("R1", 3), "f7", "1CC").with_price(12.5);
        assert_eq!(record.reaction().as_str(), "R1");
        assert_eq!(record.position(), 3);
        assert_eq!(record.price, Some(12.5));
    }
}
