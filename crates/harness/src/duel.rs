//! The scripted duel played by the harness.

use std::time::Duration;

use anyhow::Result;
use arena_core::{EntityId, PeerId, SpawnTransform, Team};
use arena_runtime::{LocalMatch, LocalMatchBuilder, RuntimeError, Seat};
use glam::Vec3;

use crate::summary::MatchSummary;

const MASTER: PeerId = PeerId(1);
const GUEST: PeerId = PeerId(2);

/// Where a cast is aimed.
#[derive(Clone, Copy, Debug)]
enum Aim {
    /// From the caster toward the target's current position.
    At(EntityId),
    /// Centered on the target's current position.
    On(EntityId),
    Caster,
}

#[derive(Clone, Debug)]
struct Order {
    at: Duration,
    caster: EntityId,
    ability: &'static str,
    aim: Aim,
}

pub struct DuelScript {
    seats: Vec<Seat>,
    orders: Vec<Order>,
    length: Duration,
}

impl DuelScript {
    /// Ranger (master) against sorcerer (guest), twelve meters apart.
    pub fn standard() -> Self {
        let ranger = Seat::new(1, "ranger", MASTER, Team::Red, Vec3::ZERO);
        let sorcerer = Seat::new(2, "sorcerer", GUEST, Team::Blue, Vec3::new(12.0, 0.0, 0.0));
        let (r, s) = (ranger.hero(), sorcerer.hero());

        let mut orders = vec![
            order(0.0, r, "arrow", Aim::At(s)),
            order(0.2, s, "fireball", Aim::At(r)),
            order(0.5, r, "haste", Aim::Caster),
            order(1.0, r, "arrow", Aim::At(s)),
            order(1.5, s, "poison_cloud", Aim::On(r)),
            order(2.0, r, "piercing_lance", Aim::At(s)),
            order(2.5, r, "second_wind", Aim::Caster),
            order(4.5, s, "fireball", Aim::At(r)),
            order(5.0, s, "frost_nova", Aim::Caster),
        ];
        // Keep the arrows coming; early ones bounce off the cooldown.
        orders.extend((3..10).map(|i| order(i as f32 * 0.75, r, "arrow", Aim::At(s))));
        orders.sort_by_key(|order| order.at);

        Self {
            seats: vec![ranger, sorcerer],
            orders,
            length: Duration::from_secs(8),
        }
    }

    pub fn seat(&self, builder: LocalMatchBuilder) -> LocalMatchBuilder {
        self.seats
            .iter()
            .cloned()
            .fold(builder.master(MASTER).peer(GUEST), LocalMatchBuilder::seat)
    }

    /// Steps the match for the length of the script, issuing each order on
    /// the first tick at or after its time.
    pub async fn play(&self, game: &mut LocalMatch, summary: &mut MatchSummary) -> Result<()> {
        let dt = game.config().tick_interval();
        let mut orders = self.orders.iter().peekable();
        let mut now = Duration::ZERO;
        while now < self.length {
            while let Some(order) = orders.next_if(|order| order.at <= now) {
                issue(game, order)?;
            }
            game.step().await?;
            summary.collect();
            now += dt;
        }
        Ok(())
    }
}

fn order(at_secs: f32, caster: EntityId, ability: &'static str, aim: Aim) -> Order {
    Order {
        at: Duration::from_secs_f32(at_secs),
        caster,
        ability,
        aim,
    }
}

/// Casts one order from the caster's own point of view. Rejections are part
/// of the duel; anything else aborts it.
fn issue(game: &mut LocalMatch, order: &Order) -> Result<()> {
    let Some(transform) = aim(game, order) else {
        tracing::info!(
            caster = %order.caster,
            ability = order.ability,
            "order skipped, hero unavailable"
        );
        return Ok(());
    };
    match game.cast(order.caster, order.ability, transform) {
        Ok(ability) => {
            tracing::info!(caster = %order.caster, key = order.ability, %ability, "cast");
            Ok(())
        }
        Err(RuntimeError::Cast(error)) => {
            tracing::info!(caster = %order.caster, key = order.ability, %error, "cast rejected");
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}

fn aim(game: &LocalMatch, order: &Order) -> Option<SpawnTransform> {
    let session = game
        .peers()
        .filter_map(|peer| game.session(peer))
        .find(|session| {
            session
                .hero(order.caster)
                .is_some_and(|hero| hero.owner == session.peer())
        })?;
    let caster = session.hero(order.caster).filter(|hero| !hero.is_dead())?;
    let origin = caster.position();
    let transform = match order.aim {
        Aim::At(target) => SpawnTransform::toward(origin, session.hero(target)?.position()),
        Aim::On(target) => {
            SpawnTransform::new(session.hero(target)?.position(), caster.kinematics.direction)
        }
        Aim::Caster => SpawnTransform::new(origin, caster.kinematics.direction),
    };
    Some(transform)
}

#[cfg(test)]
mod tests {
    use arena_content::Content;

    use super::*;

    #[tokio::test]
    async fn standard_duel_draws_blood() {
        let script = DuelScript::standard();
        let mut game = script
            .seat(LocalMatch::builder(Content::embedded().unwrap()))
            .build()
            .unwrap();
        let mut summary = MatchSummary::new(game.event_bus());

        script.play(&mut game, &mut summary).await.unwrap();
        summary.finish(&game);

        let master_damage = summary
            .events
            .get("peer:1")
            .and_then(|kinds| kinds.get("Damaged"))
            .copied()
            .unwrap_or(0);
        assert!(master_damage > 0);
        // Two peers, each seeing both heroes.
        assert_eq!(summary.heroes.len(), 4);
    }
}
