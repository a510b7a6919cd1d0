//! Debug controls as explicit publish-on-write bindings.
//!
//! A [`Tweakable`] is a shared value with a version counter: writing it bumps
//! the version and notifies subscribers. A [`ControlPanel`] owns the tweakables
//! it hands out to a debug widget and, once per frame, copies every changed
//! value into the bound entity property. Nothing in the scene is mutated behind
//! the frame loop's back.

use std::{cell::RefCell, rc::Rc};

use log::warn;

use crate::data_structures::{
    entity::{Color, Entity, EntityKind},
    scene_graph::{EntityId, SceneObjectRegistry},
};

struct Slot<T> {
    value: T,
    version: u64,
    listeners: Vec<Box<dyn FnMut(&T)>>,
}

/// Clones alias the same value.
pub struct Tweakable<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Tweakable<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: Clone + 'static> Tweakable<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot {
                value,
                version: 0,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        self.slot.borrow().value.clone()
    }

    /// Incremented by every [`set`](Self::set).
    pub fn version(&self) -> u64 {
        self.slot.borrow().version
    }

    pub fn set(&self, value: T) {
        let (value, mut listeners) = {
            let mut slot = self.slot.borrow_mut();
            slot.value = value;
            slot.version += 1;
            (slot.value.clone(), std::mem::take(&mut slot.listeners))
        };
        // Listeners run outside the borrow so they may read or even write the value.
        for listener in listeners.iter_mut() {
            listener(&value);
        }
        let mut slot = self.slot.borrow_mut();
        listeners.append(&mut slot.listeners);
        slot.listeners = listeners;
    }

    pub fn subscribe(&self, listener: impl FnMut(&T) + 'static) {
        self.slot.borrow_mut().listeners.push(Box::new(listener));
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Tweakable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.borrow();
        f.debug_struct("Tweakable")
            .field("value", &slot.value)
            .field("version", &slot.version)
            .finish()
    }
}

/// Numeric entity properties a slider can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberProperty {
    /// Lights only.
    Intensity,
    PositionX,
    PositionY,
    PositionZ,
    /// Uniform scale.
    Scale,
}

impl NumberProperty {
    pub fn name(self) -> &'static str {
        match self {
            NumberProperty::Intensity => "intensity",
            NumberProperty::PositionX => "position.x",
            NumberProperty::PositionY => "position.y",
            NumberProperty::PositionZ => "position.z",
            NumberProperty::Scale => "scale",
        }
    }

    fn read(self, entity: &Entity) -> Option<f32> {
        match self {
            NumberProperty::Intensity => entity.light_params().map(|light| light.intensity),
            NumberProperty::PositionX => Some(entity.transform.position.x),
            NumberProperty::PositionY => Some(entity.transform.position.y),
            NumberProperty::PositionZ => Some(entity.transform.position.z),
            NumberProperty::Scale => Some(entity.transform.scale.x),
        }
    }

    fn write(self, entity: &mut Entity, value: f32) {
        match self {
            NumberProperty::Intensity => {
                if let Some(light) = entity.light_params_mut() {
                    light.intensity = value;
                }
            }
            NumberProperty::PositionX => entity.transform.position.x = value,
            NumberProperty::PositionY => entity.transform.position.y = value,
            NumberProperty::PositionZ => entity.transform.position.z = value,
            NumberProperty::Scale => {
                entity.transform.scale = cgmath::Vector3::new(value, value, value)
            }
        }
    }
}

fn read_colour(entity: &Entity) -> Option<Color> {
    match &entity.kind {
        EntityKind::Mesh { material, .. } => Some(material.colour),
        EntityKind::Light(light) => Some(light.colour),
        EntityKind::Group => None,
    }
}

fn write_colour(entity: &mut Entity, colour: Color) {
    match &mut entity.kind {
        EntityKind::Mesh { material, .. } => material.colour = colour,
        EntityKind::Light(light) => light.colour = colour,
        EntityKind::Group => {}
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("entity {0:?} is not registered")]
    UnknownEntity(EntityId),
    #[error("entity {entity:?} has no property {property}")]
    Unsupported {
        entity: EntityId,
        property: &'static str,
    },
    #[error("a control named {0:?} already exists")]
    DuplicateName(String),
}

#[derive(Debug)]
enum BindingValue {
    Number {
        property: NumberProperty,
        min: f32,
        max: f32,
        step: f32,
        value: Tweakable<f32>,
    },
    Colour {
        value: Tweakable<Color>,
    },
}

#[derive(Debug)]
struct Binding {
    name: String,
    target: EntityId,
    value: BindingValue,
    applied: u64,
}

impl Binding {
    fn version(&self) -> u64 {
        match &self.value {
            BindingValue::Number { value, .. } => value.version(),
            BindingValue::Colour { value } => value.version(),
        }
    }
}

/// What a debug widget needs to draw one control.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlInfo {
    Slider {
        name: String,
        min: f32,
        max: f32,
        step: f32,
        value: f32,
    },
    Colour {
        name: String,
        value: Color,
    },
}

#[derive(Debug, Default)]
pub struct ControlPanel {
    bindings: Vec<Binding>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a slider in `min..=max` to a numeric property, starting from the entity's current value.
    pub fn slider(
        &mut self,
        name: &str,
        target: EntityId,
        property: NumberProperty,
        (min, max, step): (f32, f32, f32),
        registry: &SceneObjectRegistry,
    ) -> Result<Tweakable<f32>, BindingError> {
        self.check_name(name)?;
        let entity = registry
            .get(target)
            .ok_or(BindingError::UnknownEntity(target))?;
        let initial = property.read(entity).ok_or(BindingError::Unsupported {
            entity: target,
            property: property.name(),
        })?;
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let value = Tweakable::new(initial.clamp(min, max));
        self.bindings.push(Binding {
            name: name.to_string(),
            target,
            value: BindingValue::Number {
                property,
                min,
                max,
                step,
                value: value.clone(),
            },
            applied: 0,
        });
        Ok(value)
    }

    /// Binds a colour picker to a mesh or light colour.
    pub fn colour(
        &mut self,
        name: &str,
        target: EntityId,
        registry: &SceneObjectRegistry,
    ) -> Result<Tweakable<Color>, BindingError> {
        self.check_name(name)?;
        let entity = registry
            .get(target)
            .ok_or(BindingError::UnknownEntity(target))?;
        let initial = read_colour(entity).ok_or(BindingError::Unsupported {
            entity: target,
            property: "colour",
        })?;
        let value = Tweakable::new(initial);
        self.bindings.push(Binding {
            name: name.to_string(),
            target,
            value: BindingValue::Colour {
                value: value.clone(),
            },
            applied: 0,
        });
        Ok(value)
    }

    /// Publishes a slider value, clamped to its range. Returns false for unknown names.
    pub fn set(&self, name: &str, value: f32) -> bool {
        match self.binding(name).map(|b| &b.value) {
            Some(BindingValue::Number {
                min,
                max,
                value: tweakable,
                ..
            }) if !value.is_nan() => {
                tweakable.set(value.clamp(*min, *max));
                true
            }
            _ => false,
        }
    }

    pub fn set_colour(&self, name: &str, colour: Color) -> bool {
        match self.binding(name).map(|b| &b.value) {
            Some(BindingValue::Colour { value }) => {
                value.set(colour);
                true
            }
            _ => false,
        }
    }

    /// Copies every value changed since the last sync into its entity.
    /// Slider values are clamped to their range; NaN is never applied.
    pub fn sync(&mut self, registry: &mut SceneObjectRegistry) -> usize {
        let mut applied = 0;
        for binding in self.bindings.iter_mut() {
            let version = binding.version();
            if version == binding.applied {
                continue;
            }
            binding.applied = version;
            let Some(entity) = registry.get_mut(binding.target) else {
                warn!(
                    "Control {:?} is bound to the removed entity {:?}",
                    binding.name, binding.target
                );
                continue;
            };
            match &binding.value {
                BindingValue::Number {
                    property,
                    min,
                    max,
                    value,
                    ..
                } => {
                    let raw = value.get();
                    if raw.is_nan() {
                        warn!("Control {:?} holds NaN, keeping the previous value", binding.name);
                        continue;
                    }
                    property.write(entity, raw.clamp(*min, *max));
                }
                BindingValue::Colour { value } => write_colour(entity, value.get()),
            }
            applied += 1;
        }
        applied
    }

    pub fn controls(&self) -> Vec<ControlInfo> {
        self.bindings
            .iter()
            .map(|binding| match &binding.value {
                BindingValue::Number {
                    min,
                    max,
                    step,
                    value,
                    ..
                } => ControlInfo::Slider {
                    name: binding.name.clone(),
                    min: *min,
                    max: *max,
                    step: *step,
                    value: value.get(),
                },
                BindingValue::Colour { value } => ControlInfo::Colour {
                    name: binding.name.clone(),
                    value: value.get(),
                },
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.name == name)
    }

    fn check_name(&self, name: &str) -> Result<(), BindingError> {
        if self.binding(name).is_some() {
            return Err(BindingError::DuplicateName(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use approx::assert_relative_eq;

    use super::*;
    use crate::data_structures::entity::{Geometry, Light, Material};

    fn scene() -> (SceneObjectRegistry, EntityId, EntityId) {
        let mut registry = SceneObjectRegistry::new();
        let moon = registry
            .add_to_root(Entity::light(Light::directional(Color::hex(0xb9d5ff), 0.12)).at(4.0, 5.0, -2.0));
        let walls = registry.add_to_root(Entity::mesh(
            Geometry::cube(4.0),
            Material::coloured(Color::hex(0xac8e82)),
        ));
        (registry, moon, walls)
    }

    #[test]
    fn tweakable_notifies_and_versions() {
        let value = Tweakable::new(1.0f32);
        let alias = value.clone();
        let seen = Rc::new(Cell::new(0.0));
        let sink = seen.clone();
        value.subscribe(move |v| sink.set(*v));

        alias.set(0.5);
        assert_eq!(value.get(), 0.5);
        assert_eq!(value.version(), 1);
        assert_eq!(seen.get(), 0.5);
    }

    #[test]
    fn listeners_may_subscribe_while_notified() {
        let value = Tweakable::new(0u32);
        let inner = value.clone();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        value.subscribe(move |_| {
            counter.set(counter.get() + 1);
            inner.subscribe(|_| {});
        });
        value.set(1);
        value.set(2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn slider_starts_from_the_entity_and_clamps() {
        let (mut registry, moon, _) = scene();
        let mut panel = ControlPanel::new();
        let intensity = panel
            .slider("moon intensity", moon, NumberProperty::Intensity, (0.0, 1.0, 0.001), &registry)
            .unwrap();
        assert_relative_eq!(intensity.get(), 0.12);

        assert!(panel.set("moon intensity", 4.0));
        assert_eq!(intensity.get(), 1.0);
        assert_eq!(panel.sync(&mut registry), 1);
        assert_eq!(registry.get(moon).unwrap().light_params().unwrap().intensity, 1.0);
    }

    #[test]
    fn sync_applies_each_change_once() {
        let (mut registry, moon, _) = scene();
        let mut panel = ControlPanel::new();
        let x = panel
            .slider("moon x", moon, NumberProperty::PositionX, (-5.0, 5.0, 0.001), &registry)
            .unwrap();
        assert_eq!(panel.sync(&mut registry), 0);
        x.set(-3.0);
        assert_eq!(panel.sync(&mut registry), 1);
        assert_eq!(panel.sync(&mut registry), 0);
        assert_eq!(registry.get(moon).unwrap().transform.position.x, -3.0);
    }

    #[test]
    fn invalid_bindings_are_rejected() {
        let (mut registry, moon, walls) = scene();
        let mut panel = ControlPanel::new();
        let err = panel
            .slider("walls", walls, NumberProperty::Intensity, (0.0, 1.0, 0.1), &registry)
            .unwrap_err();
        assert!(matches!(err, BindingError::Unsupported { .. }));

        let group = registry.add_to_root(Entity::group());
        registry.remove(group);
        assert_eq!(
            panel.colour("gone", group, &registry).unwrap_err(),
            BindingError::UnknownEntity(group)
        );

        panel.colour("moon colour", moon, &registry).unwrap();
        assert_eq!(
            panel.colour("moon colour", moon, &registry).unwrap_err(),
            BindingError::DuplicateName("moon colour".into())
        );
        assert!(!panel.set("moon colour", 1.0));
        assert!(!panel.set("missing", 1.0));
    }

    #[test]
    fn widget_writes_are_clamped_on_sync() {
        let (mut registry, moon, _) = scene();
        let mut panel = ControlPanel::new();
        let intensity = panel
            .slider("moon intensity", moon, NumberProperty::Intensity, (0.0, 1.0, 0.001), &registry)
            .unwrap();

        intensity.set(f32::NAN);
        assert_eq!(panel.sync(&mut registry), 0);
        assert_relative_eq!(registry.get(moon).unwrap().light_params().unwrap().intensity, 0.12);

        intensity.set(7.5);
        assert_eq!(panel.sync(&mut registry), 1);
        assert_eq!(registry.get(moon).unwrap().light_params().unwrap().intensity, 1.0);

        intensity.set(-2.0);
        panel.sync(&mut registry);
        assert_eq!(registry.get(moon).unwrap().light_params().unwrap().intensity, 0.0);
    }

    #[test]
    fn unsupported_errors_name_the_property() {
        let (registry, _, walls) = scene();
        let mut panel = ControlPanel::new();
        let err = panel
            .slider("walls", walls, NumberProperty::Intensity, (0.0, 1.0, 0.1), &registry)
            .unwrap_err();
        assert_eq!(
            err,
            BindingError::Unsupported {
                entity: walls,
                property: "intensity",
            }
        );
        assert_eq!(NumberProperty::PositionY.name(), "position.y");
        assert_eq!(NumberProperty::Scale.name(), "scale");
    }

    #[test]
    fn removed_targets_are_skipped() {
        let (mut registry, _, walls) = scene();
        let mut panel = ControlPanel::new();
        panel.colour("walls", walls, &registry).unwrap();
        assert!(panel.set_colour("walls", Color::BLACK));
        registry.remove(walls);
        assert_eq!(panel.sync(&mut registry), 0);
        assert_eq!(panel.controls().len(), 1);
    }
}
