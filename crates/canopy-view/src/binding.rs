//! Ownership of a single, reconfigurable view.
//!
//! A [`ViewBinding`] holds the three settings that govern a view (enabled,
//! selector text, normalization) and keeps exactly the view they describe.
//! Every change disposes the current view before building the next one.

use std::sync::Arc;

use canopy_common::Warning;
use canopy_model::Model;

use crate::view::{Normalization, View, ViewError};

/// The view settings of one consumer of a model, and the view they produce.
#[derive(Debug)]
pub struct ViewBinding {
    model: Arc<Model>,
    enabled: bool,
    selector: String,
    normalization: Normalization,
    view: Option<View>,
    warnings: Vec<Warning>,
}

impl ViewBinding {
    /// A disabled binding with an empty selector and relative normalization.
    #[must_use]
    pub fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            enabled: false,
            selector: String::new(),
            normalization: Normalization::default(),
            view: None,
            warnings: Vec::new(),
        }
    }

    /// Turn the view on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuilt view cannot be registered.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), ViewError> {
        if self.enabled == enabled {
            return Ok(());
        }
        self.enabled = enabled;
        self.rebuild()
    }

    /// Replace the selector text.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuilt view cannot be registered.
    pub fn set_selector(&mut self, selector: impl Into<String>) -> Result<(), ViewError> {
        let selector = selector.into();
        if self.selector == selector {
            return Ok(());
        }
        self.selector = selector;
        self.rebuild()
    }

    /// Change the normalization mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuilt view cannot be registered.
    pub fn set_normalization(&mut self, normalization: Normalization) -> Result<(), ViewError> {
        if self.normalization == normalization {
            return Ok(());
        }
        self.normalization = normalization;
        self.rebuild()
    }

    /// Dispose the current view and build a new one if the binding is
    /// enabled and the selector is not blank.
    ///
    /// # Errors
    ///
    /// Returns an error if the new view cannot be registered.
    pub fn rebuild(&mut self) -> Result<(), ViewError> {
        if let Some(view) = self.view.take() {
            view.dispose();
        }
        self.warnings.clear();

        if self.enabled && !self.selector.trim().is_empty() {
            let view = View::create(&self.model, &self.selector, self.normalization)?;
            self.warnings = view.warnings().to_vec();
            self.view = Some(view);
        }
        Ok(())
    }

    /// The current view, if any.
    #[must_use]
    pub const fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    /// The model consumers should render: the view's model when there is a
    /// view, otherwise the source model.
    #[must_use]
    pub fn model_view(&self) -> &Model {
        self.view.as_ref().map_or(&*self.model, View::model)
    }

    /// The source model.
    #[must_use]
    pub const fn source_model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Whether the view is enabled.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Current selector text.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Current normalization mode.
    #[must_use]
    pub const fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Selector problems reported by the last rebuild.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}
