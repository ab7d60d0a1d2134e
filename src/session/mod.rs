//! Live preview sessions.
//!
//! A preview lets the user tweak smoothing or transfer parameters and see the
//! result on the mesh immediately, then either keep it or go back to exactly
//! what was there before. [`SessionController`] drives one session per mesh:
//!
//! ```text
//!            enable_preview                 disable_preview
//!   Idle ─────────────────▶ PreviewActive ─────────────────▶ Idle
//!                            │        ▲        (Restoring)
//!          parameter_changed │        │
//!                            ▼        │
//!                           Computing ┘
//! ```
//!
//! Entering `PreviewActive` captures a [`Snapshot`]. Every recompute starts
//! from that snapshot on a scratch copy of the mesh and is committed only
//! when it succeeds, so parameter changes never compound and a failed
//! recompute leaves the previous preview in place.
//!
//! The host reports edits through [`SessionController::notify`]. Writes the
//! controller makes itself are reported through the same path while
//! [`SessionController::suppress_notifications`] is set, and are not
//! mistaken for user edits.
//!
//! # Example
//!
//! ```
//! use shapekit::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh = KeyedMesh::new(vertices.clone(), vec![vec![0, 1, 2, 3]]).unwrap();
//! let mut spike = vertices;
//! spike[0].z = 1.0;
//! mesh.add_shape_key("spike", spike).unwrap();
//! let original = mesh.clone();
//!
//! let mut scene = Scene::new();
//! let handle = scene.add_mesh("Face", mesh);
//!
//! let mut controller = SessionController::new();
//! let config = PreviewConfig::smooth(FieldSelection::All, SmoothOptions::default());
//! controller.enable_preview(&mut scene, handle, config).unwrap();
//! assert_eq!(controller.state(handle), SessionState::PreviewActive);
//!
//! controller
//!     .notify(&mut scene, handle, ChangeEvent::Parameter(ParameterChange::Strength(1.0)))
//!     .unwrap();
//!
//! controller.disable_preview(&mut scene, handle).unwrap();
//! assert_eq!(scene.mesh(handle).unwrap(), &original);
//! ```

mod config;
mod owner;
mod snapshot;

pub use config::{ChangeEvent, NotifyOutcome, ParameterChange, PreviewConfig, MAX_PREVIEW_ITERATIONS};
pub use owner::{OwnerToken, PreviewOwners, PreviewTool};
pub use snapshot::Snapshot;

use std::collections::HashMap;
use std::marker::PhantomData;

use tracing::{debug, info, warn};

use crate::error::{Result, ShapeError};
use crate::mesh::DeformableMesh;
use crate::ops;
use crate::scene::{ObjectHandle, Scene};

/// Preview state of one mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No preview session.
    Idle,
    /// A preview is shown and follows parameter changes.
    PreviewActive,
    /// A recompute is being computed and committed.
    Computing,
    /// The snapshot is being written back.
    Restoring,
}

#[derive(Debug)]
struct Session {
    state: SessionState,
    snapshot: Snapshot,
    config: PreviewConfig,
    token: OwnerToken,
    recomputes: usize,
    suppressed: usize,
}

/// Drives preview sessions over the meshes of a [`Scene`].
#[derive(Debug)]
pub struct SessionController<M> {
    sessions: HashMap<ObjectHandle, Session>,
    owners: PreviewOwners,
    suppress_notifications: bool,
    _mesh: PhantomData<fn(&mut M)>,
}

impl<M: DeformableMesh + Clone> Default for SessionController<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: DeformableMesh + Clone> SessionController<M> {
    /// Create a controller with its own owner registry.
    pub fn new() -> Self {
        Self::with_owners(PreviewOwners::new())
    }

    /// Create a controller that shares `owners` with other tools.
    pub fn with_owners(owners: PreviewOwners) -> Self {
        Self {
            sessions: HashMap::new(),
            owners,
            suppress_notifications: false,
            _mesh: PhantomData,
        }
    }

    /// The owner registry this controller claims previews in.
    pub fn owners(&self) -> &PreviewOwners {
        &self.owners
    }

    /// Preview state of `mesh`.
    pub fn state(&self, mesh: ObjectHandle) -> SessionState {
        self.sessions
            .get(&mesh)
            .map_or(SessionState::Idle, |s| s.state)
    }

    /// The active configuration of `mesh`'s preview.
    pub fn config(&self, mesh: ObjectHandle) -> Option<&PreviewConfig> {
        self.sessions.get(&mesh).map(|s| &s.config)
    }

    /// Whether the controller is currently writing to a mesh itself.
    ///
    /// Always `false` between calls.
    pub fn suppress_notifications(&self) -> bool {
        self.suppress_notifications
    }

    /// Number of recomputes in the current session of `mesh`.
    pub fn recomputes(&self, mesh: ObjectHandle) -> usize {
        self.sessions.get(&mesh).map_or(0, |s| s.recomputes)
    }

    /// Number of notifications suppressed in the current session of `mesh`.
    pub fn suppressed_notifications(&self, mesh: ObjectHandle) -> usize {
        self.sessions.get(&mesh).map_or(0, |s| s.suppressed)
    }

    /// Start previewing `config` on `mesh`.
    ///
    /// # Errors
    ///
    /// - [`ShapeError::InvalidState`] if `mesh` is already previewed here
    /// - [`ShapeError::PreviewBusy`] if another tool previews `mesh`
    /// - any error of the first recompute, in which case nothing changes
    pub fn enable_preview(
        &mut self,
        scene: &mut Scene<M>,
        mesh: ObjectHandle,
        mut config: PreviewConfig,
    ) -> Result<()> {
        if let Some(session) = self.sessions.get(&mesh) {
            warn!(%mesh, state = ?session.state, "preview already active");
            return Err(ShapeError::InvalidState(format!(
                "mesh {mesh} already has an active preview"
            )));
        }
        if let PreviewConfig::Transfer { source, .. } = &config {
            if *source == mesh {
                return Err(ShapeError::invalid_param(
                    "source",
                    source,
                    "must differ from the previewed mesh",
                ));
            }
            scene.mesh(*source)?;
        }

        let snapshot = Snapshot::capture(scene.mesh(mesh)?);
        let token = self.owners.acquire(mesh, config.tool())?;
        let write_back = config.clamp_iterations();

        info!(%mesh, tool = %token.tool(), "enabling preview");
        self.sessions.insert(
            mesh,
            Session {
                state: SessionState::PreviewActive,
                snapshot,
                config: config.clone(),
                token,
                recomputes: 0,
                suppressed: 0,
            },
        );

        if let Err(err) = self.recompute(scene, mesh, &config) {
            warn!(%mesh, error = %err, "initial preview failed");
            self.end_session(mesh);
            return Err(err);
        }
        if let Some(event) = write_back {
            self.report_own_writes(scene, mesh, vec![event])?;
        }
        Ok(())
    }

    /// Recompute the preview of `mesh` with one parameter changed.
    ///
    /// The change is kept only if the recompute succeeds.
    pub fn parameter_changed(
        &mut self,
        scene: &mut Scene<M>,
        mesh: ObjectHandle,
        change: ParameterChange,
    ) -> Result<()> {
        let session = self.active_session(mesh)?;
        let mut config = session.config.clone();
        config.apply(&change)?;
        let write_back = config.clamp_iterations();

        debug!(%mesh, parameter = change.name(), "preview parameter changed");
        self.recompute(scene, mesh, &config)?;
        if let Some(session) = self.sessions.get_mut(&mesh) {
            session.config = config;
        }
        if let Some(event) = write_back {
            self.report_own_writes(scene, mesh, vec![event])?;
        }
        Ok(())
    }

    /// Stop previewing `mesh` and restore the snapshot.
    pub fn disable_preview(&mut self, scene: &mut Scene<M>, mesh: ObjectHandle) -> Result<()> {
        self.active_session(mesh)?;
        self.set_state(mesh, SessionState::Restoring);
        let restored = self.restore_snapshot(scene, mesh);
        self.set_state(mesh, SessionState::PreviewActive);
        restored?;

        info!(%mesh, recomputes = self.recomputes(mesh), "preview disabled");
        self.end_session(mesh);
        Ok(())
    }

    /// Stop previewing `mesh` and keep the previewed result.
    pub fn apply_preview(&mut self, mesh: ObjectHandle) -> Result<()> {
        self.active_session(mesh)?;
        info!(%mesh, recomputes = self.recomputes(mesh), "preview applied");
        self.end_session(mesh);
        Ok(())
    }

    /// Handle a change reported by the host.
    ///
    /// Events raised by the controller's own writes are `Suppressed`. Events
    /// for meshes without a preview are `Ignored`. While a recompute or
    /// restore is in flight every other event is rejected with
    /// [`ShapeError::InvalidState`].
    pub fn notify(
        &mut self,
        scene: &mut Scene<M>,
        mesh: ObjectHandle,
        event: ChangeEvent,
    ) -> Result<NotifyOutcome> {
        if self.suppress_notifications {
            if let Some(session) = self.sessions.get_mut(&mesh) {
                session.suppressed += 1;
            }
            debug!(%mesh, ?event, "suppressed own write");
            return Ok(NotifyOutcome::Suppressed);
        }

        match self.state(mesh) {
            SessionState::Idle => Ok(NotifyOutcome::Ignored),
            state @ (SessionState::Computing | SessionState::Restoring) => {
                warn!(%mesh, ?state, ?event, "change rejected during transition");
                Err(ShapeError::InvalidState(format!(
                    "change notification while {state:?}"
                )))
            }
            SessionState::PreviewActive => match event {
                ChangeEvent::Parameter(change) => {
                    self.parameter_changed(scene, mesh, change)?;
                    Ok(NotifyOutcome::Recomputed)
                }
                ChangeEvent::PreviewToggled(false) => {
                    self.disable_preview(scene, mesh)?;
                    Ok(NotifyOutcome::Disabled)
                }
                ChangeEvent::PreviewToggled(true) => Ok(NotifyOutcome::Ignored),
                ChangeEvent::FieldData { key } => {
                    warn!(%mesh, %key, "shape key edited during preview; the snapshot still wins");
                    Ok(NotifyOutcome::Ignored)
                }
            },
        }
    }

    fn active_session(&self, mesh: ObjectHandle) -> Result<&Session> {
        match self.sessions.get(&mesh) {
            Some(session) if session.state == SessionState::PreviewActive => Ok(session),
            Some(session) => Err(ShapeError::InvalidState(format!(
                "mesh {mesh} is {:?}",
                session.state
            ))),
            None => Err(ShapeError::InvalidState(format!(
                "mesh {mesh} has no active preview"
            ))),
        }
    }

    fn set_state(&mut self, mesh: ObjectHandle, state: SessionState) {
        if let Some(session) = self.sessions.get_mut(&mesh) {
            debug!(%mesh, from = ?session.state, to = ?state, "session state");
            session.state = state;
        }
    }

    fn end_session(&mut self, mesh: ObjectHandle) {
        if let Some(session) = self.sessions.remove(&mesh) {
            self.owners.release(session.token);
        }
    }

    fn recompute(&mut self, scene: &mut Scene<M>, mesh: ObjectHandle, config: &PreviewConfig) -> Result<()> {
        self.set_state(mesh, SessionState::Computing);
        let result = self.compute_and_commit(scene, mesh, config);
        self.set_state(mesh, SessionState::PreviewActive);
        result
    }

    fn compute_and_commit(
        &mut self,
        scene: &mut Scene<M>,
        mesh: ObjectHandle,
        config: &PreviewConfig,
    ) -> Result<()> {
        let mut scratch = scene.mesh(mesh)?.clone();
        session_snapshot(&self.sessions, mesh)?.restore(&mut scratch)?;
        let written = match config {
            PreviewConfig::Smooth { selection, options } => {
                ops::smooth_shape_keys(&mut scratch, selection, options)?.fields
            }
            PreviewConfig::Transfer {
                source,
                selection,
                options,
            } => ops::transfer_shape_keys(scene.mesh(*source)?, &mut scratch, selection, options)?.fields,
        };

        self.with_suppressed(|this: &mut Self| -> Result<()> {
            *scene.mesh_mut(mesh)? = scratch;
            let events = written
                .into_iter()
                .map(|key| ChangeEvent::FieldData { key })
                .collect();
            this.report_own_writes(scene, mesh, events)
        })?;

        if let Some(session) = self.sessions.get_mut(&mesh) {
            session.recomputes += 1;
            debug!(%mesh, recomputes = session.recomputes, "preview recomputed");
        }
        Ok(())
    }

    fn restore_snapshot(&mut self, scene: &mut Scene<M>, mesh: ObjectHandle) -> Result<()> {
        let events: Vec<ChangeEvent> = session_snapshot(&self.sessions, mesh)?
            .key_names()
            .into_iter()
            .map(|key| ChangeEvent::FieldData { key })
            .collect();

        self.with_suppressed(|this: &mut Self| -> Result<()> {
            session_snapshot(&this.sessions, mesh)?.restore(scene.mesh_mut(mesh)?)?;
            this.report_own_writes(scene, mesh, events)
        })
    }

    /// Feed the controller's own writes through the notification path.
    fn report_own_writes(
        &mut self,
        scene: &mut Scene<M>,
        mesh: ObjectHandle,
        events: Vec<ChangeEvent>,
    ) -> Result<()> {
        self.with_suppressed(|this: &mut Self| -> Result<()> {
            for event in events {
                this.notify(scene, mesh, event)?;
            }
            Ok(())
        })
    }

    fn with_suppressed<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.suppress_notifications, true);
        let result = f(self);
        self.suppress_notifications = previous;
        result
    }
}

fn session_snapshot(sessions: &HashMap<ObjectHandle, Session>, mesh: ObjectHandle) -> Result<&Snapshot> {
    sessions
        .get(&mesh)
        .map(|s| &s.snapshot)
        .ok_or_else(|| ShapeError::InvalidState(format!("mesh {mesh} has no session")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::smooth::SmoothOptions;
    use crate::mesh::KeyedMesh;
    use crate::ops::FieldSelection;
    use nalgebra::{Point3, Vector3};

    fn scene_with_spike() -> (Scene<KeyedMesh>, ObjectHandle) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh = KeyedMesh::new(vertices.clone(), vec![vec![0, 1, 2, 3]]).unwrap();
        let mut spike = vertices;
        spike[0] += Vector3::new(1.0, 0.0, 0.0);
        mesh.add_shape_key("spike", spike).unwrap();

        let mut scene = Scene::new();
        let handle = scene.add_mesh("Quad", mesh);
        (scene, handle)
    }

    fn smooth_config() -> PreviewConfig {
        PreviewConfig::smooth(FieldSelection::All, SmoothOptions::default().with_strength(1.0))
    }

    #[test]
    fn test_state_transitions() {
        let (mut scene, mesh) = scene_with_spike();
        let mut controller = SessionController::new();
        assert_eq!(controller.state(mesh), SessionState::Idle);

        controller.enable_preview(&mut scene, mesh, smooth_config()).unwrap();
        assert_eq!(controller.state(mesh), SessionState::PreviewActive);
        assert_eq!(controller.recomputes(mesh), 1);
        assert_eq!(controller.owners().owner(mesh), Some(PreviewTool::Smoothing));

        assert!(matches!(
            controller.enable_preview(&mut scene, mesh, smooth_config()),
            Err(ShapeError::InvalidState(_))
        ));

        controller.disable_preview(&mut scene, mesh).unwrap();
        assert_eq!(controller.state(mesh), SessionState::Idle);
        assert_eq!(controller.owners().owner(mesh), None);
        assert!(!controller.suppress_notifications());
    }

    #[test]
    fn test_notify_during_transition_is_rejected() {
        let (mut scene, mesh) = scene_with_spike();
        let mut controller = SessionController::new();
        controller.enable_preview(&mut scene, mesh, smooth_config()).unwrap();

        for state in [SessionState::Computing, SessionState::Restoring] {
            controller.set_state(mesh, state);
            let event = ChangeEvent::Parameter(ParameterChange::Iterations(2));
            assert!(matches!(
                controller.notify(&mut scene, mesh, event),
                Err(ShapeError::InvalidState(_))
            ));
            assert!(matches!(
                controller.disable_preview(&mut scene, mesh),
                Err(ShapeError::InvalidState(_))
            ));
        }
        controller.set_state(mesh, SessionState::PreviewActive);
        assert_eq!(controller.recomputes(mesh), 1);
    }

    #[test]
    fn test_notify_while_idle_is_ignored() {
        let (mut scene, mesh) = scene_with_spike();
        let before = scene.mesh(mesh).unwrap().clone();
        let mut controller = SessionController::new();

        let outcome = controller
            .notify(&mut scene, mesh, ChangeEvent::Parameter(ParameterChange::Strength(0.2)))
            .unwrap();
        assert_eq!(outcome, NotifyOutcome::Ignored);
        assert_eq!(scene.mesh(mesh).unwrap(), &before);
    }

    #[test]
    fn test_failed_enable_leaves_no_session() {
        let (mut scene, mesh) = scene_with_spike();
        let before = scene.mesh(mesh).unwrap().clone();
        let mut controller = SessionController::new();

        let config = PreviewConfig::smooth(FieldSelection::named(["missing"]), SmoothOptions::default());
        assert!(controller.enable_preview(&mut scene, mesh, config).is_err());
        assert_eq!(controller.state(mesh), SessionState::Idle);
        assert_eq!(controller.owners().owner(mesh), None);
        assert_eq!(scene.mesh(mesh).unwrap(), &before);
    }

    #[test]
    fn test_failed_recompute_keeps_previous_preview() {
        let (mut scene, mesh) = scene_with_spike();
        let mut controller = SessionController::new();
        controller.enable_preview(&mut scene, mesh, smooth_config()).unwrap();
        let previewed = scene.mesh(mesh).unwrap().clone();

        let change = ParameterChange::Iterations(0);
        assert!(controller.parameter_changed(&mut scene, mesh, change).is_err());
        assert_eq!(scene.mesh(mesh).unwrap(), &previewed);
        assert_eq!(controller.state(mesh), SessionState::PreviewActive);
        assert_eq!(
            controller.config(mesh),
            Some(&smooth_config())
        );
    }

    #[test]
    fn test_transfer_source_checks() {
        let (mut scene, mesh) = scene_with_spike();
        let empty = scene.add_empty("Camera");
        let mut controller = SessionController::new();

        let own = PreviewConfig::transfer(mesh, FieldSelection::All, Default::default());
        assert!(matches!(
            controller.enable_preview(&mut scene, mesh, own),
            Err(ShapeError::InvalidParameter { .. })
        ));
        let not_mesh = PreviewConfig::transfer(empty, FieldSelection::All, Default::default());
        assert!(matches!(
            controller.enable_preview(&mut scene, mesh, not_mesh),
            Err(ShapeError::NotAMesh { .. })
        ));
        assert!(matches!(
            controller.enable_preview(&mut scene, empty, smooth_config()),
            Err(ShapeError::NotAMesh { .. })
        ));
    }
}
