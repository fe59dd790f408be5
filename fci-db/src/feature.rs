//
// Copyright (c) The FCI Endpoint Contributors
//
// SPDX-License-Identifier: MIT
//

// Firmware feature-flag registry. Grounded on `fci_fw_features.c`
// (original_source) for the two-level group/element addressing and the
// "query availability before enabling" contract.

use std::collections::BTreeMap;

use fci_types::ReturnCode;

use crate::error::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeatureState {
    Disabled,
    Enabled,
}

#[derive(Clone, Debug)]
pub struct FeatureElement {
    pub group: String,
    pub index: u16,
    pub available: bool,
    pub state: FeatureState,
    pub variant: Option<String>,
}

/// A top-level firmware feature. `present` reflects whether the loaded
/// firmware image actually built this feature in; `runtime_toggleable`
/// is false for features fixed at firmware-load time. Some features own
/// a grouped table of sub-elements addressed by `(group, index)`, e.g. a
/// per-port array within the feature; others never register any.
#[derive(Clone, Debug)]
pub struct Feature {
    pub name: String,
    pub description: String,
    pub present: bool,
    pub runtime_toggleable: bool,
    pub default_value: u8,
    pub current_value: u8,
    elements: BTreeMap<(String, u16), FeatureElement>,
}

#[derive(Default)]
pub struct FeatureRegistry {
    features: BTreeMap<String, Feature>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a top-level feature at firmware-load time.
    pub fn register(&mut self, name: &str, description: &str, present: bool, runtime_toggleable: bool, default_value: u8) {
        self.features.insert(
            name.to_owned(),
            Feature {
                name: name.to_owned(),
                description: description.to_owned(),
                present,
                runtime_toggleable,
                default_value,
                current_value: default_value,
                elements: BTreeMap::new(),
            },
        );
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    /// Sets a feature's current value. Rejected if the feature isn't
    /// present in the loaded firmware or can't be changed at runtime.
    pub fn set_value(&mut self, name: &str, value: u8) -> Result<(), Error> {
        let feature = self
            .features
            .get_mut(name)
            .ok_or(Error::NotFound(ReturnCode::FwFeatureNotFound))?;
        if !feature.present || !feature.runtime_toggleable {
            return Err(Error::Invalid(ReturnCode::FwFeatureNotAvailable));
        }
        feature.current_value = value;
        Ok(())
    }

    /// Registers an element as available under `feature` at firmware-load
    /// time; elements not registered here can never be enabled.
    pub fn register_element(&mut self, feature: &str, group: &str, index: u16) -> Result<(), Error> {
        let feature = self
            .features
            .get_mut(feature)
            .ok_or(Error::NotFound(ReturnCode::FwFeatureNotFound))?;
        feature.elements.insert(
            (group.to_owned(), index),
            FeatureElement {
                group: group.to_owned(),
                index,
                available: true,
                state: FeatureState::Disabled,
                variant: None,
            },
        );
        Ok(())
    }

    pub fn element(&self, feature: &str, group: &str, index: u16) -> Option<&FeatureElement> {
        self.features.get(feature)?.elements.get(&(group.to_owned(), index))
    }

    pub fn iter_elements(&self, feature: &str) -> impl Iterator<Item = &FeatureElement> {
        self.features.get(feature).into_iter().flat_map(|f| f.elements.values())
    }

    pub fn set_element_state(&mut self, feature: &str, group: &str, index: u16, state: FeatureState) -> Result<(), Error> {
        let feature = self
            .features
            .get_mut(feature)
            .ok_or(Error::NotFound(ReturnCode::FwFeatureNotFound))?;
        let element = feature
            .elements
            .get_mut(&(group.to_owned(), index))
            .ok_or(Error::NotFound(ReturnCode::FwFeatureElementNotFound))?;
        if !element.available {
            return Err(Error::Invalid(ReturnCode::FwFeatureNotAvailable));
        }
        element.state = state;
        Ok(())
    }

    pub fn set_element_variant(&mut self, feature: &str, group: &str, index: u16, variant: String) -> Result<(), Error> {
        let feature = self
            .features
            .get_mut(feature)
            .ok_or(Error::NotFound(ReturnCode::FwFeatureNotFound))?;
        let element = feature
            .elements
            .get_mut(&(group.to_owned(), index))
            .ok_or(Error::NotFound(ReturnCode::FwFeatureElementNotFound))?;
        if !element.available {
            return Err(Error::Invalid(ReturnCode::FwFeatureNotAvailable));
        }
        element.variant = Some(variant);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unregistered_feature_value_is_rejected() {
        let mut reg = FeatureRegistry::new();
        let err = reg.set_value("l2bridge", 1).unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::FwFeatureNotFound);
    }

    #[test]
    fn non_toggleable_feature_value_is_rejected() {
        let mut reg = FeatureRegistry::new();
        reg.register("l2bridge", "L2 bridging", true, false, 1);
        let err = reg.set_value("l2bridge", 0).unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::FwFeatureNotAvailable);
    }

    #[test]
    fn unregistered_element_cannot_be_enabled() {
        let mut reg = FeatureRegistry::new();
        reg.register("l2bridge", "L2 bridging", true, true, 0);
        let err = reg.set_element_state("l2bridge", "port", 0, FeatureState::Enabled).unwrap_err();
        assert_eq!(err.return_code(), ReturnCode::FwFeatureElementNotFound);
    }

    #[test]
    fn registered_element_is_enabled_disabled_by_default() {
        let mut reg = FeatureRegistry::new();
        reg.register("l2bridge", "L2 bridging", true, true, 0);
        reg.register_element("l2bridge", "port", 0).unwrap();
        assert_eq!(reg.element("l2bridge", "port", 0).unwrap().state, FeatureState::Disabled);
        reg.set_element_state("l2bridge", "port", 0, FeatureState::Enabled).unwrap();
        assert_eq!(reg.element("l2bridge", "port", 0).unwrap().state, FeatureState::Enabled);
    }
}
