// SPDX-License-Identifier: GPL-3.0-only

//! 3D render context and renderer abstraction
//!
//! The scene renderer is an external collaborator. The core only owns the
//! scene graph state it drives (asset transforms) and the camera parameters,
//! and borrows offscreen surfaces from the renderer for the duration of one
//! hair filter step.
//!
//! Surfaces must go back to the renderer after every step, including steps
//! that fail half way. [`SurfaceGuard`] does that on drop, so an early `?`
//! return cannot leak a GPU handle at camera frame rates.

use crate::backends::pose::HeadPose;
use crate::errors::RenderError;
use crate::utils::lock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::trace;

/// Placement of one scene asset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    /// Euler angles in radians (pitch, yaw, roll)
    pub rotation: [f32; 3],
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: 1.0,
        }
    }
}

impl Transform {
    /// Place an asset at a head pose, with an extra offset in pose space
    pub fn from_pose(pose: &HeadPose, scale: f32, offset: [f32; 3]) -> Self {
        Self {
            position: [
                pose.translation[0] + offset[0],
                pose.translation[1] + offset[1],
                pose.translation[2] + offset[2],
            ],
            rotation: pose.rotation,
            scale,
        }
    }
}

/// Scene graph state: named assets and their transforms
#[derive(Debug, Clone, Default)]
pub struct Scene {
    assets: HashMap<String, Transform>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or reset) an asset at the default transform
    pub fn add_asset(&mut self, name: impl Into<String>) {
        self.assets.insert(name.into(), Transform::default());
    }

    pub fn asset(&self, name: &str) -> Option<&Transform> {
        self.assets.get(name)
    }

    /// Move an existing asset; returns false if the scene has no such asset
    pub fn set_transform(&mut self, name: &str, transform: Transform) -> bool {
        match self.assets.get_mut(name) {
            Some(slot) => {
                *slot = transform;
                true
            }
            None => false,
        }
    }

    pub fn asset_names(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    fn clear(&mut self) {
        self.assets.clear();
    }
}

/// Perspective camera parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_degrees: 63.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Shared, disposable handle to a value owned by one AR session
#[derive(Debug)]
struct Disposable<T> {
    value: Mutex<T>,
    disposed: AtomicBool,
}

impl<T> Disposable<T> {
    fn new(value: T) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(value),
            disposed: AtomicBool::new(false),
        })
    }
}

/// Handle to a session's scene
///
/// Clones refer to the same scene. Once disposed, filters treat the scene as
/// absent.
#[derive(Debug, Clone)]
pub struct SceneHandle {
    inner: Arc<Disposable<Scene>>,
}

impl SceneHandle {
    pub fn new(scene: Scene) -> Self {
        Self {
            inner: Disposable::new(scene),
        }
    }

    /// Run `f` with exclusive access to the scene
    pub fn with_scene<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> R {
        f(&mut lock(&self.inner.value))
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Drop all assets and mark the scene unusable
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            lock(&self.inner.value).clear();
            trace!("Scene disposed");
        }
    }

    pub fn ptr_eq(&self, other: &SceneHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Handle to a session's camera
#[derive(Debug, Clone)]
pub struct CameraHandle {
    inner: Arc<Disposable<Camera>>,
}

impl CameraHandle {
    pub fn new(camera: Camera) -> Self {
        Self {
            inner: Disposable::new(camera),
        }
    }

    pub fn camera(&self) -> Camera {
        *lock(&self.inner.value)
    }

    pub fn set_camera(&self, camera: Camera) {
        *lock(&self.inner.value) = camera;
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
    }
}

/// The render handles a pipeline pass may use
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub scene: Option<SceneHandle>,
    pub camera: Option<CameraHandle>,
}

impl RenderContext {
    pub fn new(scene: SceneHandle, camera: CameraHandle) -> Self {
        Self {
            scene: Some(scene),
            camera: Some(camera),
        }
    }

    /// Scene and camera, if both are attached and neither was disposed
    pub fn usable(&self) -> Option<(&SceneHandle, &CameraHandle)> {
        match (&self.scene, &self.camera) {
            (Some(scene), Some(camera)) if !scene.is_disposed() && !camera.is_disposed() => {
                Some((scene, camera))
            }
            _ => None,
        }
    }
}

/// Offscreen RGBA render target borrowed from a renderer
#[derive(Debug)]
pub struct Surface {
    /// Renderer-assigned identifier
    pub id: u64,
    pub width: u32,
    pub height: u32,
    /// RGBA8, straight alpha, row-major
    pub pixels: Vec<u8>,
}

impl Surface {
    /// Transparent surface of the given size
    pub fn transparent(id: u64, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }
}

/// External 3D scene renderer
pub trait SceneRenderer: Send + Sync {
    /// Borrow an offscreen surface of the given size
    fn acquire_surface(&self, width: u32, height: u32) -> Result<Surface, RenderError>;

    /// Render `scene` as seen from `camera` into `surface`
    fn render(&self, scene: &Scene, camera: &Camera, surface: &mut Surface)
    -> Result<(), RenderError>;

    /// Give a surface back; called exactly once per acquired surface
    fn release_surface(&self, surface: Surface);
}

/// Scoped surface borrow that returns the surface on drop
pub struct SurfaceGuard<'a> {
    renderer: &'a dyn SceneRenderer,
    surface: Option<Surface>,
}

impl<'a> SurfaceGuard<'a> {
    pub fn acquire(
        renderer: &'a dyn SceneRenderer,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let surface = renderer.acquire_surface(width, height)?;
        trace!(surface = surface.id, width, height, "Acquired offscreen surface");
        Ok(Self {
            renderer,
            surface: Some(surface),
        })
    }

    /// Render into the guarded surface
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        match self.surface.as_mut() {
            Some(surface) => self.renderer.render(scene, camera, surface),
            None => Err(RenderError::SurfaceUnavailable("surface already released".into())),
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }
}

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            trace!(surface = surface.id, "Releasing offscreen surface");
            self.renderer.release_surface(surface);
        }
    }
}
