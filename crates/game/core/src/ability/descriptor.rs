//! Ability parameters as authored and as cast.
//!
//! A [`SpawnDescriptor`] is what the factory hands out: base values plus
//! per-rank overrides. [`SpawnDescriptor::configure`] folds in the caster's
//! rank and damage stat and yields the [`AbilityConfig`] that travels with
//! `CreateAbilityInstance`. Durations are authored as fractional seconds.

use std::fmt;
use std::time::Duration;

use crate::buffs::BuffSpec;
use crate::config::secs;
use crate::error::CombatError;
use crate::state::{EntityId, Hero, StatKind, Team};

/// Name of an ability prefab, e.g. `"fireball"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AbilityKey(pub String);

impl AbilityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbilityKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for AbilityKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AbilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

bitflags::bitflags! {
    /// Which heroes an effect may touch, relative to the caster.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct TargetFilter: u8 {
        const ENEMIES = 1 << 0;
        const ALLIES = 1 << 1;
        const SELF = 1 << 2;
    }
}

impl Default for TargetFilter {
    fn default() -> Self {
        Self::ENEMIES
    }
}

impl TargetFilter {
    /// Living heroes only; the caster is matched by `SELF`, never by `ALLIES`.
    pub fn admits(self, caster: EntityId, caster_team: Team, target: &Hero) -> bool {
        if target.is_dead() {
            return false;
        }
        if target.id == caster {
            return self.contains(Self::SELF);
        }
        if caster_team.is_hostile_to(target.team) {
            self.contains(Self::ENEMIES)
        } else {
            self.contains(Self::ALLIES)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CrowdControlKind {
    Stun,
    Root,
}

/// Movement impairment applied through the movement collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrowdControl {
    pub kind: CrowdControlKind,
    pub duration_secs: f32,
}

impl CrowdControl {
    pub fn duration(&self) -> Duration {
        secs(self.duration_secs)
    }
}

/// Buff as authored on a descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuffEffect {
    pub stat: StatKind,
    pub magnitude: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_percentage: bool,
    pub duration_secs: f32,
}

impl BuffEffect {
    pub fn spec(&self) -> BuffSpec {
        BuffSpec {
            stat: self.stat,
            magnitude: self.magnitude,
            is_percentage: self.is_percentage,
            duration: secs(self.duration_secs),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectileParams {
    pub speed: f32,
    pub collision_radius: f32,
    /// Constant downward acceleration is applied when set.
    #[cfg_attr(feature = "serde", serde(default))]
    pub gravity: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub penetrates: bool,
    /// Targets a penetrating projectile may pass through before it is spent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_penetrations: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: TargetFilter,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AreaParams {
    pub radius: f32,
    /// Radius cap for growing areas; `None` keeps the radius fixed.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_radius: Option<f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub growth_per_sec: f32,
    /// Per-target re-trigger interval. Zero applies once per instance.
    pub damage_interval_secs: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: TargetFilter,
}

impl AreaParams {
    pub fn damage_interval(&self) -> Duration {
        secs(self.damage_interval_secs)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuraParams {
    /// Zero affects the caster only.
    pub radius: f32,
    pub buffs: Vec<BuffEffect>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: TargetFilter,
    /// Without a lifetime the instance lingers at least this long.
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_active_secs: f32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepAction {
    /// Hits enemies around the caster for `damage * multiplier`.
    Strike { radius: f32, multiplier: f32 },
    Stun { radius: f32, duration_secs: f32 },
    Root { radius: f32, duration_secs: f32 },
    HealCaster { amount: f32 },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScriptStep {
    /// Offset from cast time.
    pub at_secs: f32,
    pub action: StepAction,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScriptParams {
    pub steps: Vec<ScriptStep>,
}

#[derive(Clone, Debug, PartialEq, strum::EnumDiscriminants)]
#[strum_discriminants(name(AbilityKindTag), derive(strum::Display, Hash))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbilityKind {
    Projectile(ProjectileParams),
    AreaScan(AreaParams),
    PureBuff(AuraParams),
    Scripted(ScriptParams),
}

/// Per-rank overrides; absent fields keep the base value.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RankOverride {
    pub damage: Option<f32>,
    pub lifetime_secs: Option<f32>,
    pub radius: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnDescriptor {
    pub key: AbilityKey,
    pub kind: AbilityKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub damage: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_magic: bool,
    /// `None` only makes sense for pure buffs and scripts, which end on their own.
    pub lifetime_secs: Option<f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cooldown_secs: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mana_cost: f32,
    /// Fraction of the caster's damage stat added to `damage`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub caster_scaling: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub on_hit: Vec<BuffEffect>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub crowd_control: Option<CrowdControl>,
    /// Index 0 is rank 1.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ranks: Vec<RankOverride>,
}

/// What a cast charges its caster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CastCosts {
    pub cooldown: Duration,
    pub mana: f32,
}

impl SpawnDescriptor {
    /// Cooldown and mana cost of one cast. Negative and NaN values become
    /// zero. An infinite cooldown saturates at [`crate::config::SECS_CEILING`]
    /// and an infinite cost is never affordable.
    pub fn costs(&self) -> (CastCosts, Vec<CombatError>) {
        let mut issues = Sanitizer {
            key: &self.key,
            min_secs: 0.0,
            issues: Vec::new(),
        };
        let (mut cooldown, mut mana) = (self.cooldown_secs, self.mana_cost);
        issues.not_below_zero("cooldown_secs", &mut cooldown);
        issues.not_below_zero("mana_cost", &mut mana);
        let costs = CastCosts {
            cooldown: secs(cooldown),
            mana,
        };
        (costs, issues.issues)
    }

    /// Resolves the cast-time configuration for a caster's rank and damage stat.
    pub fn configure(&self, rank: u8, caster_damage: f32) -> AbilityConfig {
        let overrides = usize::from(rank)
            .checked_sub(1)
            .and_then(|index| self.ranks.get(index))
            .cloned()
            .unwrap_or_default();

        let mut kind = self.kind.clone();
        if let Some(radius) = overrides.radius {
            match &mut kind {
                AbilityKind::AreaScan(area) => area.radius = radius,
                AbilityKind::PureBuff(aura) => aura.radius = radius,
                AbilityKind::Projectile(_) | AbilityKind::Scripted(_) => {}
            }
        }

        AbilityConfig {
            key: self.key.clone(),
            kind,
            rank,
            damage: overrides.damage.unwrap_or(self.damage) + self.caster_scaling * caster_damage,
            is_magic: self.is_magic,
            lifetime_secs: overrides.lifetime_secs.or(self.lifetime_secs),
            on_hit: self.on_hit.clone(),
            crowd_control: self.crowd_control,
        }
    }
}

/// Fully resolved parameters of one cast.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityConfig {
    pub key: AbilityKey,
    pub kind: AbilityKind,
    pub rank: u8,
    pub damage: f32,
    pub is_magic: bool,
    pub lifetime_secs: Option<f32>,
    pub on_hit: Vec<BuffEffect>,
    pub crowd_control: Option<CrowdControl>,
}

impl AbilityConfig {
    /// Lifetime given to projectiles and areas authored without one.
    pub const UNBOUNDED_LIFETIME_SECS: f32 = 10.0;

    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime_secs.map(secs)
    }

    pub fn tag(&self) -> AbilityKindTag {
        AbilityKindTag::from(&self.kind)
    }

    /// Clamps nonsensical values in place and reports each clamp.
    ///
    /// Negative or NaN durations become `min_secs`; so does a zero lifetime.
    /// Projectiles and areas always end up with a finite lifetime.
    /// A zero damage interval or step offset is meaningful and kept. Negative
    /// distances and speeds become zero.
    pub fn sanitize(&mut self, min_secs: f32) -> Vec<CombatError> {
        let mut issues = Sanitizer {
            key: &self.key,
            min_secs,
            issues: Vec::new(),
        };

        match self.lifetime_secs.as_mut() {
            Some(lifetime) => issues.duration("lifetime_secs", lifetime, false),
            None if matches!(
                self.kind,
                AbilityKind::Projectile(_) | AbilityKind::AreaScan(_)
            ) =>
            {
                let mut unbounded = f32::INFINITY;
                issues.clamp("lifetime_secs", &mut unbounded, Self::UNBOUNDED_LIFETIME_SECS);
                self.lifetime_secs = Some(unbounded);
            }
            None => {}
        }
        issues.non_negative("damage", &mut self.damage);
        for buff in &mut self.on_hit {
            issues.duration("on_hit.duration_secs", &mut buff.duration_secs, false);
        }
        if let Some(cc) = self.crowd_control.as_mut() {
            issues.duration("crowd_control.duration_secs", &mut cc.duration_secs, false);
        }

        match &mut self.kind {
            AbilityKind::Projectile(p) => {
                issues.non_negative("speed", &mut p.speed);
                issues.non_negative("collision_radius", &mut p.collision_radius);
            }
            AbilityKind::AreaScan(a) => {
                issues.non_negative("radius", &mut a.radius);
                issues.non_negative("growth_per_sec", &mut a.growth_per_sec);
                issues.duration("damage_interval_secs", &mut a.damage_interval_secs, true);
                if let Some(max) = a.max_radius.as_mut() {
                    issues.non_negative("max_radius", max);
                }
            }
            AbilityKind::PureBuff(b) => {
                issues.non_negative("radius", &mut b.radius);
                issues.duration("min_active_secs", &mut b.min_active_secs, true);
                for buff in &mut b.buffs {
                    issues.duration("buffs.duration_secs", &mut buff.duration_secs, false);
                }
            }
            AbilityKind::Scripted(s) => {
                for step in &mut s.steps {
                    issues.duration("steps.at_secs", &mut step.at_secs, true);
                    match &mut step.action {
                        StepAction::Strike { radius, .. } => issues.non_negative("radius", radius),
                        StepAction::Stun {
                            radius,
                            duration_secs,
                        }
                        | StepAction::Root {
                            radius,
                            duration_secs,
                        } => {
                            issues.non_negative("radius", radius);
                            issues.duration("steps.duration_secs", duration_secs, false);
                        }
                        StepAction::HealCaster { amount } => issues.non_negative("amount", amount),
                    }
                }
            }
        }
        issues.issues
    }
}

struct Sanitizer<'a> {
    key: &'a AbilityKey,
    min_secs: f32,
    issues: Vec<CombatError>,
}

impl Sanitizer<'_> {
    fn duration(&mut self, field: &'static str, value: &mut f32, allow_zero: bool) {
        let valid = value.is_finite() && (*value > 0.0 || (allow_zero && *value == 0.0));
        if !valid {
            self.clamp(field, value, self.min_secs);
        }
    }

    fn non_negative(&mut self, field: &'static str, value: &mut f32) {
        if !(value.is_finite() && *value >= 0.0) {
            self.clamp(field, value, 0.0);
        }
    }

    fn not_below_zero(&mut self, field: &'static str, value: &mut f32) {
        if value.is_nan() || *value < 0.0 {
            self.clamp(field, value, 0.0);
        }
    }

    fn clamp(&mut self, field: &'static str, value: &mut f32, to: f32) {
        self.issues.push(CombatError::Configuration {
            ability: self.key.clone(),
            field,
            value: *value,
            clamped_to: to,
        });
        *value = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nova() -> SpawnDescriptor {
        SpawnDescriptor {
            key: AbilityKey::from("frost_nova"),
            kind: AbilityKind::AreaScan(AreaParams {
                radius: 4.0,
                max_radius: None,
                growth_per_sec: 0.0,
                damage_interval_secs: 0.0,
                targets: TargetFilter::ENEMIES,
            }),
            damage: 40.0,
            is_magic: true,
            lifetime_secs: Some(1.0),
            cooldown_secs: 8.0,
            mana_cost: 60.0,
            caster_scaling: 0.5,
            on_hit: Vec::new(),
            crowd_control: None,
            ranks: vec![
                RankOverride::default(),
                RankOverride {
                    damage: Some(70.0),
                    lifetime_secs: None,
                    radius: Some(6.0),
                },
            ],
        }
    }

    #[test]
    fn rank_overrides_and_scaling_apply() {
        let config = nova().configure(2, 100.0);
        assert_eq!(config.damage, 120.0);
        assert_eq!(config.lifetime_secs, Some(1.0));
        match config.kind {
            AbilityKind::AreaScan(area) => assert_eq!(area.radius, 6.0),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn unknown_rank_falls_back_to_base_values() {
        let config = nova().configure(9, 0.0);
        assert_eq!(config.damage, 40.0);
    }

    #[test]
    fn sanitize_clamps_negative_durations_uniformly() {
        let mut config = nova().configure(1, 0.0);
        config.lifetime_secs = Some(-3.0);
        if let AbilityKind::AreaScan(area) = &mut config.kind {
            area.damage_interval_secs = f32::NAN;
        }
        let issues = config.sanitize(0.01);
        assert_eq!(issues.len(), 2);
        assert_eq!(config.lifetime_secs, Some(0.01));
        if let AbilityKind::AreaScan(area) = &config.kind {
            assert_eq!(area.damage_interval_secs, 0.01);
        }
    }

    #[test]
    fn negative_or_nan_costs_are_free() {
        let mut descriptor = nova();
        descriptor.cooldown_secs = f32::NAN;
        descriptor.mana_cost = -5.0;
        let (costs, issues) = descriptor.costs();
        assert_eq!(costs.cooldown, Duration::ZERO);
        assert_eq!(costs.mana, 0.0);
        assert_eq!(issues.len(), 2);

        descriptor.cooldown_secs = f32::INFINITY;
        descriptor.mana_cost = f32::INFINITY;
        let (costs, issues) = descriptor.costs();
        assert_eq!(costs.cooldown, crate::config::SECS_CEILING);
        assert_eq!(costs.mana, f32::INFINITY);
        assert!(issues.is_empty());

        assert!(nova().costs().1.is_empty());
        assert_eq!(nova().costs().0.cooldown, Duration::from_secs(8));
    }

    #[test]
    fn zero_interval_is_kept() {
        let mut config = nova().configure(1, 0.0);
        assert!(config.sanitize(0.01).is_empty());
        assert_eq!(config.tag(), AbilityKindTag::AreaScan);
    }
}
