//! Orders the tactical layer emits for the movement/unit collaborator.
//!
//! The core never moves units itself. Every decision becomes a [`UnitOrder`] collected in
//! an [`IntentBuffer`] and handed back to the caller at the end of the tick.

use engine_core::{Entity, Vec3};

/// A single behaviour or movement request for one unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitIntent {
    SetDestination(Vec3),
    SetAggressive(bool),
    EnableFlanking(bool),
    ProvideSupportFire(bool),
    UseCover(Vec3),
    HoldFire(bool),
    /// Bunker enters its fortified mode.
    Fortify,
    PriorityTarget { target: Entity, airborne: bool },
    DamageReduction { source: &'static str, amount: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitOrder {
    pub unit: Entity,
    pub intent: UnitIntent,
}

/// The unit-side collaborator that executes orders.
pub trait UnitController {
    fn set_destination(&mut self, unit: Entity, position: Vec3);
    fn set_aggressive(&mut self, unit: Entity, aggressive: bool);
    fn enable_flanking(&mut self, unit: Entity, enable: bool);
    fn provide_support_fire(&mut self, unit: Entity, enable: bool);
    fn use_cover(&mut self, unit: Entity, position: Vec3);

    fn hold_fire(&mut self, _unit: Entity, _hold: bool) {}
    fn fortify(&mut self, _unit: Entity) {}
    fn set_priority_target(&mut self, _unit: Entity, _target: Entity, _airborne: bool) {}
    fn apply_damage_reduction(&mut self, _unit: Entity, _source: &'static str, _amount: f32) {}
}

impl UnitOrder {
    /// Forward this order to the matching controller method.
    pub fn dispatch(&self, controller: &mut impl UnitController) {
        let unit = self.unit;
        match self.intent {
            UnitIntent::SetDestination(p) => controller.set_destination(unit, p),
            UnitIntent::SetAggressive(on) => controller.set_aggressive(unit, on),
            UnitIntent::EnableFlanking(on) => controller.enable_flanking(unit, on),
            UnitIntent::ProvideSupportFire(on) => controller.provide_support_fire(unit, on),
            UnitIntent::UseCover(p) => controller.use_cover(unit, p),
            UnitIntent::HoldFire(on) => controller.hold_fire(unit, on),
            UnitIntent::Fortify => controller.fortify(unit),
            UnitIntent::PriorityTarget { target, airborne } => {
                controller.set_priority_target(unit, target, airborne)
            }
            UnitIntent::DamageReduction { source, amount } => {
                controller.apply_damage_reduction(unit, source, amount)
            }
        }
    }
}

/// Ordered collection of orders produced during a tick.
#[derive(Debug, Default, Clone)]
pub struct IntentBuffer {
    orders: Vec<UnitOrder>,
}

impl IntentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: Entity, intent: UnitIntent) {
        self.orders.push(UnitOrder { unit, intent });
    }

    /// Queue the same intent for several units.
    pub fn push_all(&mut self, units: impl IntoIterator<Item = Entity>, intent: UnitIntent) {
        for unit in units {
            self.push(unit, intent);
        }
    }

    pub fn orders(&self) -> &[UnitOrder] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders addressed to `unit`, oldest first.
    pub fn for_unit(&self, unit: Entity) -> impl Iterator<Item = &UnitIntent> + '_ {
        self.orders
            .iter()
            .filter(move |o| o.unit == unit)
            .map(|o| &o.intent)
    }

    /// Most recent destination ordered for `unit`.
    pub fn last_destination(&self, unit: Entity) -> Option<Vec3> {
        self.for_unit(unit)
            .filter_map(|i| match i {
                UnitIntent::SetDestination(p) => Some(*p),
                _ => None,
            })
            .last()
    }

    pub fn drain(&mut self) -> Vec<UnitOrder> {
        std::mem::take(&mut self.orders)
    }
}
