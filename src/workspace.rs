//! A workspace bundles one model build with its views.

use log::debug;

use crate::error::Error;
use crate::layout::{self, WorkspaceLayout};
use crate::model::Model;
use crate::view::Views;

/// One described architecture: the model plus the views defined over it.
#[derive(Debug, Default)]
pub struct Workspace {
    pub name: String,
    pub description: String,
    pub version: String,
    pub model: Model,
    pub views: Views,
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        Workspace {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Checks the model's structural invariants. Problems are collected
    /// into one [`Error::Validation`], nothing is auto-corrected.
    pub fn validate(&self) -> Result<(), Error> {
        self.model.validate()
    }

    /// Runs the closing population passes on every view: influencer
    /// expansion where requested, relationship completion and animation
    /// step inference. Call once the view definitions are fully applied.
    pub fn finalize(&mut self) {
        let Workspace { model, views, .. } = self;
        for view in views.iter_mut() {
            view.finalize(model);
        }
        debug!(workspace = self.name.as_str(), views = self.views.len(); "workspace finalized");
    }

    /// Extracts the visual state worth persisting across rebuilds.
    pub fn layout(&self) -> WorkspaceLayout {
        layout::extract_layout(&self.views)
    }

    /// Applies visual state saved against this same build.
    pub fn apply_layout(&mut self, saved: &WorkspaceLayout) {
        layout::apply_layout(&mut self.views, saved);
    }

    /// Applies visual state saved against an earlier build, matching
    /// elements by structural keys through `remote`.
    pub fn merge_layout(&mut self, remote: &Model, saved: &WorkspaceLayout) {
        layout::merge_layout(&self.model, &mut self.views, remote, saved);
    }
}
