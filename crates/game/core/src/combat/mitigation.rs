//! Damage mitigation.

/// Reduces raw damage by the defender's resistance.
///
/// # Formula
///
/// ```text
/// mitigated = amount * 100 / (100 + resist)
/// ```
///
/// `resist` is magic resistance for magic damage and armor otherwise.
/// Negative resistance is treated as zero so mitigation never amplifies.
pub fn mitigate(amount: f32, resist: f32) -> f32 {
    let resist = resist.max(0.0);
    amount.max(0.0) * 100.0 / (100.0 + resist)
}

/// Applies mitigated damage to current health, clamped at zero.
pub fn apply_damage(health: f32, mitigated: f32) -> f32 {
    (health - mitigated).max(0.0)
}
