use rand::Rng;

/// Applies `±variance` uniform damage variance. Floors at 1.
pub fn variance_roll(base: f64, variance: f64, rng: &mut impl Rng) -> i64 {
    if variance <= 0.0 {
        return base.round().max(1.0) as i64;
    }
    let low = base * (1.0 - variance);
    let high = base * (1.0 + variance);
    let (low, high) = if low <= high { (low, high) } else { (high, low) };
    let rolled = rng.gen_range(low..=high);
    rolled.round().max(1.0) as i64
}

/// Rolls `chance` in `[0, 1]` against a uniform draw.
pub fn roll_chance(chance: f64, rng: &mut impl Rng) -> bool {
    if chance <= 0.0 {
        return false;
    }
    if chance >= 1.0 {
        return true;
    }
    rng.gen_range(0.0..1.0) < chance
}

/// Parses a `"min-max"` amount range (inclusive) and rolls a value in it.
pub fn roll_amount_range(range: &str, rng: &mut impl Rng) -> Result<u32, AmountRangeError> {
    let (min, max) = parse_amount_range(range)?;
    if min > max {
        return Err(AmountRangeError::Inverted(range.to_string()));
    }
    Ok(rng.gen_range(min..=max))
}

pub fn parse_amount_range(range: &str) -> Result<(u32, u32), AmountRangeError> {
    let (min_s, max_s) = range
        .split_once('-')
        .ok_or_else(|| AmountRangeError::Malformed(range.to_string()))?;
    let min: u32 = min_s
        .trim()
        .parse()
        .map_err(|_| AmountRangeError::Malformed(range.to_string()))?;
    let max: u32 = max_s
        .trim()
        .parse()
        .map_err(|_| AmountRangeError::Malformed(range.to_string()))?;
    Ok((min, max))
}

#[derive(Debug, thiserror::Error)]
pub enum AmountRangeError {
    #[error("malformed amount range: {0:?} (expected \"min-max\")")]
    Malformed(String),
    #[error("inverted amount range: {0:?} (min greater than max)")]
    Inverted(String),
}

/// Picks a uniformly random element from a non-empty slice.
pub fn pick_uniform<'a, T>(items: &'a [T], rng: &mut impl Rng) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..items.len());
    items.get(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zero_variance_is_exact_round() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(variance_roll(3.0, 0.0, &mut rng), 3);
        assert_eq!(variance_roll(0.4, 0.0, &mut rng), 1); // floors at 1
    }

    #[test]
    fn chance_one_always_hits() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            assert!(roll_chance(1.0, &mut rng));
        }
    }

    #[test]
    fn amount_range_parses_and_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let v = roll_amount_range("1-3", &mut rng).unwrap();
            assert!((1..=3).contains(&v));
        }
    }
}
