use pcs_core::pointcloud::{GenericValue, PointCursor, PtColor, PtGeometry};

use crate::error::SetupError;
use crate::passthrough::{take_chain, PassThrough};

/// Relational operators for attribute based point selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparator {
    fn evaluate<T: PartialOrd>(self, attribute: &T, comparison: &T) -> bool {
        match self {
            Comparator::Equal => attribute == comparison,
            Comparator::NotEqual => attribute != comparison,
            Comparator::Greater => attribute > comparison,
            Comparator::GreaterOrEqual => attribute >= comparison,
            Comparator::Less => attribute < comparison,
            Comparator::LessOrEqual => attribute <= comparison,
        }
    }
}

// The comparison value fixes the domain once, at setup.
enum ComparisonDomain {
    Numeric(f64),
    Textual(String),
}

/// Keeps only points whose named attribute satisfies a relational
/// comparison against a fixed value.
///
/// The comparison domain is chosen by the comparison value's kind: numeric
/// values compare after widening to f64, text values compare
/// lexicographically. A point whose attribute is absent, or whose stored
/// value cannot be cast into the comparison domain, is a non-match for
/// every operator except `NotEqual`, where it counts as a match (an absent
/// value is trivially different).
pub struct AttributeSelector {
    base: PassThrough,
    attribute_name: String,
    comparator: Comparator,
    comparison: ComparisonDomain,
}

impl AttributeSelector {
    /// Wrap the chain head in a selector stage.
    ///
    /// The stage immediately positions itself on the first satisfying point
    /// (possibly exhausting the source). Fails without touching the chain if
    /// the attribute name is empty.
    pub fn attach(
        chain: &mut Box<dyn PointCursor>,
        attribute_name: &str,
        comparator: Comparator,
        value: GenericValue,
    ) -> Result<(), SetupError> {
        if attribute_name.is_empty() {
            return Err(SetupError::EmptyAttributeName);
        }

        let comparison = match value {
            GenericValue::Text(s) => ComparisonDomain::Textual(s),
            GenericValue::Int(v) => ComparisonDomain::Numeric(v as f64),
            GenericValue::UInt(v) => ComparisonDomain::Numeric(v as f64),
            GenericValue::Float(v) => ComparisonDomain::Numeric(v),
        };

        let mut stage = AttributeSelector {
            base: PassThrough::new(take_chain(chain)),
            attribute_name: attribute_name.to_string(),
            comparator,
            comparison,
        };

        if !stage.current_matches() {
            stage.advance();
        }

        *chain = Box::new(stage);
        Ok(())
    }

    fn current_matches(&self) -> bool {
        if !self.base.has_data() {
            return false;
        }

        let attribute = match self.base.attribute_by_name(&self.attribute_name) {
            Some(attribute) => attribute,
            None => return self.comparator == Comparator::NotEqual,
        };

        match &self.comparison {
            ComparisonDomain::Numeric(comparison) => match attribute.to_numeric() {
                Ok(value) => self.comparator.evaluate(&value, comparison),
                // Uncastable values behave like absent ones.
                Err(_) => self.comparator == Comparator::NotEqual,
            },
            ComparisonDomain::Textual(comparison) => {
                self.comparator.evaluate(&attribute.to_text(), comparison)
            }
        }
    }
}

impl PointCursor for AttributeSelector {
    fn position(&self) -> PtGeometry<f64> {
        self.base.position()
    }

    fn color(&self) -> Option<PtColor<f64>> {
        self.base.color()
    }

    fn attribute_by_id(&self, id: usize) -> Option<GenericValue> {
        self.base.attribute_by_id(id)
    }

    fn attribute_by_name(&self, name: &str) -> Option<GenericValue> {
        self.base.attribute_by_name(name)
    }

    fn attribute_list(&self) -> Vec<String> {
        self.base.attribute_list()
    }

    fn advance(&mut self) -> bool {
        loop {
            if !self.base.advance() {
                return false;
            }
            if self.current_matches() {
                return true;
            }
        }
    }

    fn has_data(&self) -> bool {
        self.base.has_data()
    }
}
