use crate::errors::LibraryResult;
use crate::math::decimal::Decimal;
use crate::math::safe_math::SafeMath;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeightedValue {
    pub value: Decimal,
    pub weight: u64,
}

impl WeightedValue {
    pub fn new(value: Decimal, weight: u64) -> Self {
        Self { value, weight }
    }
}

/// Weighted median over the decimal value of each entry. Zero-weight entries
/// are ignored; returns `None` when nothing carries weight.
///
/// When the cumulative weight lands exactly on half of the total, the result
/// is the exact midpoint between that value and the next larger one.
pub fn weighted_median(values: &[WeightedValue]) -> LibraryResult<Option<Decimal>> {
    let mut sorted: Vec<&WeightedValue> = values.iter().filter(|v| v.weight > 0).collect();
    if sorted.is_empty() {
        return Ok(None);
    }
    sorted.sort_by(|a, b| a.value.cmp(&b.value));

    let total = sorted
        .iter()
        .try_fold(0_u128, |acc, v| acc.safe_add(u128::from(v.weight)))?;

    let mut cumulative = 0_u128;
    for (i, entry) in sorted.iter().enumerate() {
        cumulative = cumulative.safe_add(u128::from(entry.weight))?;
        let doubled = cumulative.safe_mul(2)?;

        if doubled > total {
            return Ok(Some(entry.value));
        }
        if doubled == total {
            return match sorted.get(i + 1) {
                Some(next) => entry.value.midpoint(&next.value).map(Some),
                None => Ok(Some(entry.value)),
            };
        }
    }

    Ok(sorted.last().map(|v| v.value))
}
