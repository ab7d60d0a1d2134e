//! Preview ownership shared between tools.
//!
//! At most one tool may preview a given mesh. Controllers that share a
//! [`PreviewOwners`] registry (by cloning it) see each other's claims.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{Result, ShapeError};
use crate::scene::ObjectHandle;

/// A tool that can run a live preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewTool {
    /// Shape key smoothing.
    Smoothing,
    /// Shape key transfer.
    Transfer,
}

impl PreviewTool {
    /// Tool name, for logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            PreviewTool::Smoothing => "smoothing",
            PreviewTool::Transfer => "transfer",
        }
    }
}

impl fmt::Display for PreviewTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Proof that a tool holds the preview of a mesh.
///
/// Only obtainable from [`PreviewOwners::acquire`] and given back with
/// [`PreviewOwners::release`].
#[derive(Debug, PartialEq, Eq)]
pub struct OwnerToken {
    mesh: ObjectHandle,
    tool: PreviewTool,
}

impl OwnerToken {
    /// The previewed mesh.
    pub fn mesh(&self) -> ObjectHandle {
        self.mesh
    }

    /// The owning tool.
    pub fn tool(&self) -> PreviewTool {
        self.tool
    }
}

/// Registry of preview owners, one per mesh.
#[derive(Debug, Clone, Default)]
pub struct PreviewOwners {
    owners: Rc<RefCell<HashMap<ObjectHandle, PreviewTool>>>,
}

impl PreviewOwners {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the preview of `mesh` for `tool`.
    ///
    /// Fails with [`ShapeError::PreviewBusy`] while any tool holds it.
    pub fn acquire(&self, mesh: ObjectHandle, tool: PreviewTool) -> Result<OwnerToken> {
        let mut owners = self.owners.borrow_mut();
        if let Some(owner) = owners.get(&mesh) {
            return Err(ShapeError::PreviewBusy {
                mesh: mesh.raw(),
                owner: owner.name(),
            });
        }
        owners.insert(mesh, tool);
        debug!(%mesh, %tool, "preview owner acquired");
        Ok(OwnerToken { mesh, tool })
    }

    /// Give a claim back.
    pub fn release(&self, token: OwnerToken) {
        self.owners.borrow_mut().remove(&token.mesh);
        debug!(mesh = %token.mesh, tool = %token.tool, "preview owner released");
    }

    /// The tool currently previewing `mesh`.
    pub fn owner(&self, mesh: ObjectHandle) -> Option<PreviewTool> {
        self.owners.borrow().get(&mesh).copied()
    }
}
