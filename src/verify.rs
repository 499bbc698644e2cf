use rug::Integer;
use rug::integer::IsPrime;

use crate::error::FactorError;
use crate::pipeline::Item;

// Miller-Rabin rounds; error probability below 4^-30.
const PRIMALITY_REPS: u32 = 30;

/// Cross-check a factored item against GMP.
///
/// The product of the factors must equal the value, the factors must be in
/// ascending order, and every factor must be prime.
pub fn verify(item: &Item) -> Result<(), FactorError> {
    let fail = |reason: String| FactorError::Verification {
        value: item.value,
        reason,
    };

    let product = item
        .factors
        .iter()
        .fold(Integer::from(1), |acc, &factor| acc * factor);
    if product != item.value {
        return Err(fail(format!("factors multiply to {}", product)));
    }

    if let Some(pair) = item.factors.windows(2).find(|w| w[0] > w[1]) {
        return Err(fail(format!("{} listed before {}", pair[0], pair[1])));
    }

    for &factor in &item.factors {
        if Integer::from(factor).is_probably_prime(PRIMALITY_REPS) == IsPrime::No {
            return Err(fail(format!("{} is not prime", factor)));
        }
    }

    Ok(())
}
