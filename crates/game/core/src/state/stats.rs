//! Hero stat block.
//!
//! Resource maximums are part of the block but are not buffable; only the
//! combat stats enumerated by [`StatKind`] can carry temporary modifiers.

/// Buffable combat stat.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum StatKind {
    Damage,
    AttackSpeed,
    MoveSpeed,
    Armor,
    MagicResist,
    HealthRegen,
    ManaRegen,
}

/// Live stat values of a hero.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatBlock {
    pub max_health: f32,
    pub max_mana: f32,
    pub damage: f32,
    pub attack_speed: f32,
    pub move_speed: f32,
    pub armor: f32,
    pub magic_resist: f32,
    /// Health regenerated per second.
    pub health_regen: f32,
    /// Mana regenerated per second.
    pub mana_regen: f32,
}

impl StatBlock {
    pub fn get(&self, kind: StatKind) -> f32 {
        match kind {
            StatKind::Damage => self.damage,
            StatKind::AttackSpeed => self.attack_speed,
            StatKind::MoveSpeed => self.move_speed,
            StatKind::Armor => self.armor,
            StatKind::MagicResist => self.magic_resist,
            StatKind::HealthRegen => self.health_regen,
            StatKind::ManaRegen => self.mana_regen,
        }
    }

    pub fn set(&mut self, kind: StatKind, value: f32) {
        let slot = match kind {
            StatKind::Damage => &mut self.damage,
            StatKind::AttackSpeed => &mut self.attack_speed,
            StatKind::MoveSpeed => &mut self.move_speed,
            StatKind::Armor => &mut self.armor,
            StatKind::MagicResist => &mut self.magic_resist,
            StatKind::HealthRegen => &mut self.health_regen,
            StatKind::ManaRegen => &mut self.mana_regen,
        };
        *slot = value;
    }

    /// Resistance used to mitigate a hit of the given school.
    pub fn resistance(&self, is_magic: bool) -> f32 {
        if is_magic {
            self.magic_resist
        } else {
            self.armor
        }
    }
}

impl Default for StatBlock {
    fn default() -> Self {
        Self {
            max_health: 500.0,
            max_mana: 300.0,
            damage: 50.0,
            attack_speed: 1.0,
            move_speed: 10.0,
            armor: 20.0,
            magic_resist: 20.0,
            health_regen: 2.0,
            mana_regen: 3.0,
        }
    }
}
