use bigdecimal::{BigDecimal, One, Zero};

/// Both numeric columns of a fundraising project after a credit. They are
/// always written together.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectProgress {
    pub current_amount: BigDecimal,
    pub progress_percentage: BigDecimal,
}

/// `clamp(current / target, 0, 1) * 100`, rounded to two places.
/// A non-positive target is treated as 1 so the ratio is always defined.
pub fn progress_percentage(current: &BigDecimal, target: &BigDecimal) -> BigDecimal {
    let target = if *target > BigDecimal::zero() {
        target.clone()
    } else {
        BigDecimal::one()
    };

    let ratio = current / &target;
    let clamped = if ratio < BigDecimal::zero() {
        BigDecimal::zero()
    } else if ratio > BigDecimal::one() {
        BigDecimal::one()
    } else {
        ratio
    };

    (clamped * BigDecimal::from(100)).round(2)
}

pub fn apply_credit(current: &BigDecimal, target: &BigDecimal, amount: &BigDecimal) -> ProjectProgress {
    let current_amount = current + amount;
    let progress_percentage = progress_percentage(&current_amount, target);
    ProjectProgress {
        current_amount,
        progress_percentage,
    }
}
