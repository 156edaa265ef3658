use std::sync::Arc;

use serde::{Deserialize, Serialize};

use henfight_core::diagnostics::Diagnostics;
use henfight_core::error::CoreError;
use henfight_core::math::Pose;
use henfight_core::services::{
    EffectService, EntityId, PLAYER_TAG, PhysicsService, PrefabId, SceneQuery,
};

/// Something a gate can carry to its target: needs an entity to move and
/// a way to fade its owner's view.
pub trait Teleportable {
    fn entity(&self) -> EntityId;

    fn fade_to_black(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    Inactive,
    Active,
}

/// What happened when something touched the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Gate not active yet.
    Ignored,
    /// Contact was not a player.
    NotAPlayer,
    /// Contact could not be handled; a report was filed.
    Skipped,
    Teleported(EntityId),
}

pub struct GateBindings {
    pub name: String,
    pub entity: EntityId,
    pub spawn_waypoint: Pose,
    pub target_waypoint: Option<Pose>,
    pub portal_prefab: Option<PrefabId>,
    pub physics: Option<Arc<dyn PhysicsService>>,
    pub effects: Option<Arc<dyn EffectService>>,
    pub scene: Option<Arc<dyn SceneQuery>>,
}

impl GateBindings {
    pub fn new(name: impl Into<String>, entity: EntityId, spawn_waypoint: Pose) -> Self {
        Self {
            name: name.into(),
            entity,
            spawn_waypoint,
            target_waypoint: None,
            portal_prefab: None,
            physics: None,
            effects: None,
            scene: None,
        }
    }

    pub fn with_target(mut self, target: Pose) -> Self {
        self.target_waypoint = Some(target);
        self
    }

    pub fn with_portal_prefab(mut self, prefab: PrefabId) -> Self {
        self.portal_prefab = Some(prefab);
        self
    }

    pub fn with_services<H>(mut self, host: &Arc<H>) -> Self
    where
        H: PhysicsService + EffectService + SceneQuery + 'static,
    {
        self.physics = Some(Arc::clone(host) as Arc<dyn PhysicsService>);
        self.effects = Some(Arc::clone(host) as Arc<dyn EffectService>);
        self.scene = Some(Arc::clone(host) as Arc<dyn SceneQuery>);
        self
    }

    pub fn missing(&self) -> Vec<CoreError> {
        let owner = self.name.as_str();
        let mut missing = Vec::new();
        if self.target_waypoint.is_none() {
            missing.push(CoreError::missing(owner, "target waypoint"));
        }
        if self.portal_prefab.is_none() {
            missing.push(CoreError::missing(owner, "portal prefab"));
        }
        if self.physics.is_none() {
            missing.push(CoreError::missing(owner, "physics service"));
        }
        if self.effects.is_none() {
            missing.push(CoreError::missing(owner, "effect service"));
        }
        if self.scene.is_none() {
            missing.push(CoreError::missing_optional(owner, "scene query"));
        }
        missing
    }
}

/// One-way portal door. Once activated it teleports the player that
/// touches it to the target waypoint.
///
/// Only the contacting player moves; the other player stays put.
pub struct PortalGate {
    bindings: GateBindings,
    diagnostics: Arc<dyn Diagnostics>,
    state: GateState,
}

impl PortalGate {
    pub fn new(bindings: GateBindings, diagnostics: Arc<dyn Diagnostics>) -> Self {
        for missing in bindings.missing() {
            diagnostics.report(&missing);
        }
        Self {
            bindings,
            diagnostics,
            state: GateState::Inactive,
        }
    }

    pub fn name(&self) -> &str {
        &self.bindings.name
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == GateState::Active
    }

    /// Open the portal. Returns false when it was already open.
    pub fn activate_door(&mut self) -> bool {
        if self.state == GateState::Active {
            return false;
        }
        self.state = GateState::Active;

        if let Some(effects) = &self.bindings.effects {
            effects.set_visible(self.bindings.entity, false);
            if let Some(prefab) = self.bindings.portal_prefab {
                effects.spawn_effect(prefab, self.bindings.spawn_waypoint);
            }
        }

        tracing::info!(gate = %self.bindings.name, "portal door activated");
        true
    }

    /// Handle a collision with `contact`. `players` are the agents that may
    /// be carried; the one whose entity matches the contact root fades out
    /// before it is moved.
    pub fn on_player_contact(
        &mut self,
        contact: Option<EntityId>,
        players: &[&dyn Teleportable],
    ) -> ContactOutcome {
        if self.state != GateState::Active {
            return ContactOutcome::Ignored;
        }

        let Some(contact) = contact else {
            self.diagnostics.report(&CoreError::invalid(
                self.bindings.name.as_str(),
                "could not teleport player, contact entity is null",
            ));
            return ContactOutcome::Skipped;
        };

        let root = match &self.bindings.scene {
            Some(scene) => {
                let root = scene.root_of(contact);
                if !scene.find_entities_by_tag(PLAYER_TAG).contains(&root) {
                    return ContactOutcome::NotAPlayer;
                }
                root
            },
            None => {
                if !players.iter().any(|p| p.entity() == contact) {
                    return ContactOutcome::NotAPlayer;
                }
                contact
            },
        };

        let Some(target) = self.bindings.target_waypoint else {
            self.diagnostics.report(&CoreError::invalid(
                self.bindings.name.as_str(),
                "could not teleport player, no target waypoint",
            ));
            return ContactOutcome::Skipped;
        };
        let Some(physics) = &self.bindings.physics else {
            return ContactOutcome::Skipped;
        };

        if let Some(player) = players.iter().find(|p| p.entity() == root) {
            player.fade_to_black();
        }
        physics.set_position(root, target.position);

        tracing::info!(gate = %self.bindings.name, entity = root.0, "player teleported");
        ContactOutcome::Teleported(root)
    }

    /// Level reload: close the portal and show the door again.
    pub fn reload(&mut self) {
        if self.state == GateState::Active
            && let Some(effects) = &self.bindings.effects
        {
            effects.set_visible(self.bindings.entity, true);
        }
        self.state = GateState::Inactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use henfight_core::math::Vec3;
    use henfight_core::test_helpers::{Call, RecordingHost};
    use std::cell::Cell;

    const DOOR: EntityId = EntityId(100);
    const PLAYER: EntityId = EntityId(1);
    const OTHER: EntityId = EntityId(2);
    const PLAYER_BODY: EntityId = EntityId(50);
    const CRATE: EntityId = EntityId(77);

    struct FakePlayer {
        entity: EntityId,
        fades: Cell<u32>,
    }

    impl FakePlayer {
        fn new(entity: EntityId) -> Self {
            Self {
                entity,
                fades: Cell::new(0),
            }
        }
    }

    impl Teleportable for FakePlayer {
        fn entity(&self) -> EntityId {
            self.entity
        }

        fn fade_to_black(&self) {
            self.fades.set(self.fades.get() + 1);
        }
    }

    fn target() -> Pose {
        Pose::at(Vec3::planar(40.0, -12.0))
    }

    fn host() -> Arc<RecordingHost> {
        let host = Arc::new(RecordingHost::default());
        host.tag(PLAYER, PLAYER_TAG);
        host.tag(OTHER, PLAYER_TAG);
        host.parent(PLAYER_BODY, PLAYER);
        host.place(PLAYER, Vec3::planar(1.0, 1.0));
        host.place(OTHER, Vec3::planar(-5.0, 0.0));
        host
    }

    fn gate(host: &Arc<RecordingHost>) -> PortalGate {
        let bindings = GateBindings::new("Door A", DOOR, Pose::at(Vec3::planar(2.0, 2.0)))
            .with_target(target())
            .with_portal_prefab(PrefabId(9))
            .with_services(host);
        PortalGate::new(bindings, Arc::clone(host) as Arc<dyn Diagnostics>)
    }

    #[test]
    fn starts_inactive_and_valid() {
        let host = host();
        let g = gate(&host);
        assert_eq!(g.state(), GateState::Inactive);
        assert!(host.reports().is_empty());
    }

    #[test]
    fn missing_bindings_reported() {
        let host = host();
        let _g = PortalGate::new(
            GateBindings::new("Door B", DOOR, Pose::default()),
            Arc::clone(&host) as Arc<dyn Diagnostics>,
        );
        assert_eq!(host.reports().len(), 5);
    }

    #[test]
    fn activation_hides_door_and_spawns_portal_once() {
        let host = host();
        let mut g = gate(&host);

        assert!(g.activate_door());
        assert!(!g.activate_door());
        assert!(g.is_active());

        assert_eq!(
            host.count(|c| matches!(c, Call::SpawnEffect { .. })),
            1,
            "second activation must not spawn another portal"
        );
        assert!(host.calls().contains(&Call::SpawnEffect {
            prefab: PrefabId(9),
            pose: Pose::at(Vec3::planar(2.0, 2.0)),
        }));
        assert!(host.calls().contains(&Call::SetVisible {
            entity: DOOR,
            visible: false
        }));
    }

    #[test]
    fn inactive_gate_never_teleports() {
        let host = host();
        let mut g = gate(&host);
        let p = FakePlayer::new(PLAYER);

        assert_eq!(
            g.on_player_contact(Some(PLAYER), &[&p]),
            ContactOutcome::Ignored
        );
        assert_eq!(host.count(|c| matches!(c, Call::SetPosition { .. })), 0);
        assert_eq!(p.fades.get(), 0);
    }

    #[test]
    fn active_gate_teleports_contacting_player_only() {
        let host = host();
        let mut g = gate(&host);
        g.activate_door();
        let p = FakePlayer::new(PLAYER);
        let o = FakePlayer::new(OTHER);

        let outcome = g.on_player_contact(Some(PLAYER), &[&p, &o]);
        assert_eq!(outcome, ContactOutcome::Teleported(PLAYER));
        assert_eq!(p.fades.get(), 1);
        assert_eq!(o.fades.get(), 0);
        assert_eq!(host.position(PLAYER), target().position);
        assert_eq!(host.position(OTHER), Vec3::planar(-5.0, 0.0));
    }

    #[test]
    fn child_collider_resolves_to_player_root() {
        let host = host();
        let mut g = gate(&host);
        g.activate_door();
        let p = FakePlayer::new(PLAYER);

        let outcome = g.on_player_contact(Some(PLAYER_BODY), &[&p]);
        assert_eq!(outcome, ContactOutcome::Teleported(PLAYER));
        assert_eq!(p.fades.get(), 1);
    }

    #[test]
    fn non_player_contact_ignored() {
        let host = host();
        let mut g = gate(&host);
        g.activate_door();

        assert_eq!(g.on_player_contact(Some(CRATE), &[]), ContactOutcome::NotAPlayer);
        assert_eq!(host.count(|c| matches!(c, Call::SetPosition { .. })), 0);
    }

    #[test]
    fn null_contact_reported_and_skipped() {
        let host = host();
        let mut g = gate(&host);
        g.activate_door();

        assert_eq!(g.on_player_contact(None, &[]), ContactOutcome::Skipped);
        assert!(matches!(
            host.reports().as_slice(),
            [CoreError::InvalidOperation { .. }]
        ));
    }

    #[test]
    fn missing_target_reported_on_contact() {
        let host = host();
        let bindings = GateBindings::new("Door C", DOOR, Pose::default())
            .with_portal_prefab(PrefabId(9))
            .with_services(&host);
        let mut g = PortalGate::new(bindings, Arc::clone(&host) as Arc<dyn Diagnostics>);
        g.activate_door();
        host.clear_calls();

        assert_eq!(g.on_player_contact(Some(PLAYER), &[]), ContactOutcome::Skipped);
        assert_eq!(host.reports().len(), 1);
        assert_eq!(host.count(|c| matches!(c, Call::SetPosition { .. })), 0);
    }

    #[test]
    fn reload_closes_the_portal() {
        let host = host();
        let mut g = gate(&host);
        g.activate_door();
        g.reload();
        assert_eq!(g.state(), GateState::Inactive);
        assert!(host.calls().contains(&Call::SetVisible {
            entity: DOOR,
            visible: true
        }));
        // Can be opened again after reload
        assert!(g.activate_door());
    }
}
