#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Scene collection and per-frame ray-march rendering.
//!
//! A [`Scene`] holds shape entities in a two-level hierarchy. Every frame the
//! [`FrameRenderer`] flattens it with [`collect_shapes`], uploads the records
//! and the camera/light parameters to a [`compute::ComputeBackend`], and
//! dispatches the ray-march kernel into a render target sized to the viewport.

pub mod camera;
pub mod collector;
pub mod config;
mod error;
pub mod frame;
pub mod gpu_types;
pub mod scene;
pub mod shape;
pub mod transient;

pub use camera::{Camera, Light, LightKind};
pub use collector::{collect_shapes, order_shapes, OrderedShape, BLEND_STRENGTH_SCALE};
pub use config::{RenderConfig, MIN_JITTER_SPAN};
pub use error::RenderError;
pub use frame::{dispatch_size, Accumulation, FrameRenderer, FrameStats};
pub use scene::{NodeId, Scene, SceneFile, SceneNode};
pub use shape::{Operation, Shape, ShapeType};
pub use transient::TransientResources;
