//! Pairing attacking assault squads with the nearest support squad.

use engine_core::{planar_distance, Faction, Vec3};

use crate::director::TacticalEvent;
use crate::squad::{Squad, SquadId, SquadPhase, SquadRole, SquadRoster};

/// Point every attacking assault squad's nearest same-faction support squad at it.
///
/// With `hysteresis = Some(h)` a support squad already covering a valid attacking squad
/// only switches when the newcomer is closer by more than `h`.
pub fn assign_support(roster: &mut SquadRoster, hysteresis: Option<f32>, events: &mut Vec<TacticalEvent>) {
    let attacking: Vec<(SquadId, Vec3, Faction)> = roster
        .iter()
        .filter(|s| is_attacking_assault(s))
        .map(|s| (s.id, s.centroid, s.faction))
        .collect();

    for (assault, assault_centroid, faction) in attacking {
        let nearest = roster
            .iter()
            .filter(|s| s.role == SquadRole::Support && s.faction == faction && !s.is_inert())
            .min_by(|a, b| {
                planar_distance(a.centroid, assault_centroid)
                    .total_cmp(&planar_distance(b.centroid, assault_centroid))
                    .then(a.id.cmp(&b.id))
            })
            .map(|s| (s.id, s.centroid, s.support_target));
        let Some((support, support_centroid, current)) = nearest else {
            continue;
        };
        if current == Some(assault) {
            continue;
        }

        if let (Some(margin), Some(current)) = (hysteresis, current) {
            let current_centroid = roster
                .get(current)
                .filter(|s| is_attacking_assault(s) && s.faction == faction)
                .map(|s| s.centroid);
            if let Some(current_centroid) = current_centroid {
                let kept = planar_distance(support_centroid, current_centroid);
                let offered = planar_distance(support_centroid, assault_centroid);
                if offered + margin >= kept {
                    continue;
                }
            }
        }

        if let Some(squad) = roster.get_mut(support) {
            squad.support_target = Some(assault);
            log::debug!("support squad {} now covers assault squad {}", support, assault);
            events.push(TacticalEvent::SupportAssigned { support, assault });
        }
    }
}

fn is_attacking_assault(squad: &Squad) -> bool {
    squad.role == SquadRole::Assault && squad.phase == SquadPhase::Attacking && !squad.is_inert()
}
