//! Preview configuration and change notifications.

use crate::algo::smooth::SmoothOptions;
use crate::algo::transfer::TransferOptions;
use crate::error::{Result, ShapeError};
use crate::ops::FieldSelection;
use crate::scene::ObjectHandle;

use super::owner::PreviewTool;

/// Largest iteration count a live preview runs.
///
/// Higher requests are clamped and the clamped value is written back.
pub const MAX_PREVIEW_ITERATIONS: usize = 10;

/// What a preview session recomputes.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewConfig {
    /// Smooth the selected keys of the previewed mesh.
    Smooth {
        /// Keys to smooth.
        selection: FieldSelection,
        /// Smoothing parameters.
        options: SmoothOptions,
    },
    /// Transfer the selected keys of `source` onto the previewed mesh.
    Transfer {
        /// Mesh the keys come from.
        source: ObjectHandle,
        /// Source keys to transfer.
        selection: FieldSelection,
        /// Transfer parameters.
        options: TransferOptions,
    },
}

impl PreviewConfig {
    /// Smoothing preview of the given selection.
    pub fn smooth(selection: FieldSelection, options: SmoothOptions) -> Self {
        PreviewConfig::Smooth { selection, options }
    }

    /// Transfer preview from `source`.
    pub fn transfer(source: ObjectHandle, selection: FieldSelection, options: TransferOptions) -> Self {
        PreviewConfig::Transfer {
            source,
            selection,
            options,
        }
    }

    /// The tool that owns a preview with this configuration.
    pub fn tool(&self) -> PreviewTool {
        match self {
            PreviewConfig::Smooth { .. } => PreviewTool::Smoothing,
            PreviewConfig::Transfer { .. } => PreviewTool::Transfer,
        }
    }

    /// The field selection.
    pub fn selection(&self) -> &FieldSelection {
        match self {
            PreviewConfig::Smooth { selection, .. } | PreviewConfig::Transfer { selection, .. } => {
                selection
            }
        }
    }

    /// Clamp the iteration count to [`MAX_PREVIEW_ITERATIONS`].
    ///
    /// Returns the write-back notification when the value changed.
    pub(crate) fn clamp_iterations(&mut self) -> Option<ChangeEvent> {
        match self {
            PreviewConfig::Smooth { options, .. } if options.iterations > MAX_PREVIEW_ITERATIONS => {
                options.iterations = MAX_PREVIEW_ITERATIONS;
                Some(ChangeEvent::Parameter(ParameterChange::Iterations(
                    MAX_PREVIEW_ITERATIONS,
                )))
            }
            _ => None,
        }
    }

    /// Apply a parameter change in place.
    pub(crate) fn apply(&mut self, change: &ParameterChange) -> Result<()> {
        match (self, change) {
            (PreviewConfig::Smooth { options, .. }, ParameterChange::Iterations(n)) => {
                options.iterations = *n;
            }
            (PreviewConfig::Smooth { options, .. }, ParameterChange::Strength(s)) => {
                if !(0.0..=1.0).contains(s) {
                    return Err(ShapeError::invalid_param("strength", s, "must be in [0, 1]"));
                }
                options.strength = *s;
            }
            (PreviewConfig::Transfer { options, .. }, ParameterChange::WeightCutoff(c)) => {
                options.weight_cutoff = *c;
            }
            (config, ParameterChange::Selection { field, selected }) => {
                let selection = match config {
                    PreviewConfig::Smooth { selection, .. } => selection,
                    PreviewConfig::Transfer { selection, .. } => selection,
                };
                selection.set_selected(field, *selected);
            }
            (config, change) => {
                return Err(ShapeError::invalid_param(
                    "parameter",
                    change.name(),
                    match config.tool() {
                        PreviewTool::Smoothing => "not used by smoothing previews",
                        PreviewTool::Transfer => "not used by transfer previews",
                    },
                ));
            }
        }
        Ok(())
    }
}

/// A user-facing parameter edit.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterChange {
    /// New smoothing iteration count.
    Iterations(usize),
    /// New smoothing strength.
    Strength(f64),
    /// A key was added to or removed from the selection.
    Selection {
        /// Key name.
        field: String,
        /// Whether the key is now selected.
        selected: bool,
    },
    /// New transfer weight cutoff.
    WeightCutoff(f64),
}

impl ParameterChange {
    /// Parameter name, for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            ParameterChange::Iterations(_) => "iterations",
            ParameterChange::Strength(_) => "strength",
            ParameterChange::Selection { .. } => "selection",
            ParameterChange::WeightCutoff(_) => "weight_cutoff",
        }
    }
}

/// A change reported by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A preview parameter changed.
    Parameter(ParameterChange),
    /// A shape key's data was written.
    FieldData {
        /// Name of the written key.
        key: String,
    },
    /// The preview toggle was switched.
    PreviewToggled(bool),
}

/// How the controller handled a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Nothing to do for this event.
    Ignored,
    /// The event came from the controller's own write.
    Suppressed,
    /// The preview was recomputed.
    Recomputed,
    /// The preview was switched off and the snapshot restored.
    Disabled,
}
