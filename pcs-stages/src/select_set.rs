use std::collections::BTreeSet;

use pcs_core::pointcloud::{GenericValue, PointCursor, PtColor, PtGeometry};

use crate::error::SetupError;
use crate::passthrough::{take_chain, PassThrough};

/// Membership mode for set based point selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    InSet,
    NotInSet,
}

enum SetValues {
    Numeric(Vec<f64>),
    Textual(BTreeSet<String>),
}

impl SetValues {
    fn from_values(values: Vec<GenericValue>) -> Result<Self, SetupError> {
        if values.is_empty() {
            return Err(SetupError::EmptySet);
        }

        if values[0].is_numeric() {
            if !values.iter().all(|v| v.is_numeric()) {
                return Err(SetupError::MixedSetDomains);
            }
            let mut widened: Vec<f64> = Vec::with_capacity(values.len());
            for value in &values {
                // Infallible for numeric kinds.
                if let Ok(v) = value.to_numeric() {
                    widened.push(v);
                }
            }
            widened.sort_by(f64::total_cmp);
            widened.dedup();
            Ok(SetValues::Numeric(widened))
        } else {
            if values.iter().any(|v| v.is_numeric()) {
                return Err(SetupError::MixedSetDomains);
            }
            Ok(SetValues::Textual(
                values.into_iter().map(|v| v.to_text()).collect(),
            ))
        }
    }

    fn contains(&self, value: &GenericValue) -> Option<bool> {
        match self {
            SetValues::Numeric(widened) => match value.to_numeric() {
                Ok(v) => Some(widened.iter().any(|c| *c == v)),
                Err(_) => None,
            },
            SetValues::Textual(set) => Some(set.contains(&value.to_text())),
        }
    }
}

/// Keeps points whose named attribute belongs (or does not belong) to a
/// fixed value set.
///
/// The whole set shares one comparison domain, fixed at setup from the
/// values' kinds; mixing numeric and text values fails setup. A point whose
/// attribute is absent (or uncastable into the set's domain) passes in
/// `InSet` mode and is filtered in `NotInSet` mode, mirroring the
/// missing-attribute convention of [`crate::AttributeSelector`].
pub struct AttributeSetSelector {
    base: PassThrough,
    attribute_name: String,
    mode: SetMode,
    values: SetValues,
}

impl AttributeSetSelector {
    pub fn attach(
        chain: &mut Box<dyn PointCursor>,
        attribute_name: &str,
        mode: SetMode,
        values: Vec<GenericValue>,
    ) -> Result<(), SetupError> {
        if attribute_name.is_empty() {
            return Err(SetupError::EmptyAttributeName);
        }
        let values = SetValues::from_values(values)?;

        let mut stage = AttributeSetSelector {
            base: PassThrough::new(take_chain(chain)),
            attribute_name: attribute_name.to_string(),
            mode,
            values,
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
            None => return self.mode == SetMode::InSet,
        };

        match self.values.contains(&attribute) {
            Some(in_set) => match self.mode {
                SetMode::InSet => in_set,
                SetMode::NotInSet => !in_set,
            },
            // Uncastable values behave like absent ones.
            None => self.mode == SetMode::InSet,
        }
    }
}

impl PointCursor for AttributeSetSelector {
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
