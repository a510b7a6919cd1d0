//! Time-parameterised motion.
//!
//! An [`OrbitPath`] maps elapsed seconds to a position on a horizontal circle
//! (optionally wobbling in radius) with a vertical sum of sines on top. It has
//! no state of its own, so the same `t` always yields the same position.
//! [`AnimationDriver`] pairs paths with entities and writes the results into the
//! scene graph once per frame, with one clock reading shared by every track.

use cgmath::Vector3;
use log::warn;

use crate::data_structures::scene_graph::{EntityId, SceneObjectRegistry};

/// `amplitude * sin(frequency * t)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SineTerm {
    pub amplitude: f32,
    pub frequency: f32,
}

impl SineTerm {
    pub fn new(amplitude: f32, frequency: f32) -> Self {
        Self {
            amplitude,
            frequency,
        }
    }

    pub fn at(&self, t: f32) -> f32 {
        self.amplitude * (self.frequency * t).sin()
    }
}

fn sum_at(terms: &[SineTerm], t: f32) -> f32 {
    terms.iter().map(|term| term.at(t)).sum()
}

/// Which trigonometric function drives which horizontal axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrbitArrangement {
    /// `x = cos`, `z = sin`
    #[default]
    CosSin,
    /// `x = sin`, `z = cos`
    SinCos,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrbitPath {
    /// Radians per second; negative values orbit clockwise.
    pub angular_speed: f32,
    pub radius: f32,
    /// Added to the angle, radians.
    pub phase: f32,
    pub arrangement: OrbitArrangement,
    /// Added to the radius on the x axis.
    pub wobble_x: Vec<SineTerm>,
    /// Added to the radius on the z axis.
    pub wobble_z: Vec<SineTerm>,
    pub vertical_offset: f32,
    pub vertical: Vec<SineTerm>,
}

impl OrbitPath {
    pub fn circle(angular_speed: f32, radius: f32) -> Self {
        Self {
            angular_speed,
            radius,
            ..Self::default()
        }
    }

    pub fn arranged(mut self, arrangement: OrbitArrangement) -> Self {
        self.arrangement = arrangement;
        self
    }

    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    pub fn bobbing(mut self, amplitude: f32, frequency: f32) -> Self {
        self.vertical.push(SineTerm::new(amplitude, frequency));
        self
    }

    pub fn wobbling(mut self, x: SineTerm, z: SineTerm) -> Self {
        self.wobble_x.push(x);
        self.wobble_z.push(z);
        self
    }

    pub fn angle_at(&self, t: f32) -> f32 {
        self.angular_speed * t + self.phase
    }

    pub fn position_at(&self, t: f32) -> Vector3<f32> {
        let angle = self.angle_at(t);
        let (first, second) = match self.arrangement {
            OrbitArrangement::CosSin => (angle.cos(), angle.sin()),
            OrbitArrangement::SinCos => (angle.sin(), angle.cos()),
        };
        Vector3::new(
            first * (self.radius + sum_at(&self.wobble_x, t)),
            self.vertical_offset + sum_at(&self.vertical, t),
            second * (self.radius + sum_at(&self.wobble_z, t)),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub entity: EntityId,
    pub path: OrbitPath,
}

#[derive(Clone, Debug, Default)]
pub struct AnimationDriver {
    tracks: Vec<Track>,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an existing track for the same entity.
    pub fn animate(&mut self, entity: EntityId, path: OrbitPath) {
        match self.tracks.iter_mut().find(|track| track.entity == entity) {
            Some(track) => track.path = path,
            None => self.tracks.push(Track { entity, path }),
        }
    }

    pub fn stop_animating(&mut self, entity: EntityId) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|track| track.entity != entity);
        before != self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Positions of every track at `t` seconds, in track order.
    pub fn compute(&self, t: f32) -> Vec<(EntityId, Vector3<f32>)> {
        self.tracks
            .iter()
            .map(|track| (track.entity, track.path.position_at(t)))
            .collect()
    }

    /// Writes local positions; returns how many entities were moved.
    pub fn apply(&self, t: f32, registry: &mut SceneObjectRegistry) -> usize {
        let mut moved = 0;
        for (id, position) in self.compute(t) {
            match registry.get_mut(id) {
                Some(entity) => {
                    entity.transform.position = position;
                    moved += 1;
                }
                None => warn!("Animated entity {:?} is no longer in the scene", id),
            }
        }
        moved
    }
}
