use crate::error::FactorError;

/// Factor slots per item unless configured otherwise.
pub const DEFAULT_MAX_FACTORS: usize = 10;

/// Largest value accepted for factoring (2^48).
///
/// Keeps the composite table at most 2^24 entries.
pub const MAX_VALUE: i64 = 1 << 48;

/// Primality by odd trial division up to floor(sqrt(num)).
///
/// 2 is the only even prime; anything below 2 is not prime.
pub fn is_prime(num: i64) -> bool {
    if num < 2 {
        return false;
    }
    if num % 2 == 0 {
        return num == 2;
    }

    let threshold = num.isqrt();
    (3..=threshold).step_by(2).all(|divisor| num % divisor != 0)
}

/// Composite flags for every index in `0..=threshold`.
///
/// Built once per top-level factor call and shared by every level of the
/// trial-division recursion.
struct Sieve {
    composite: Vec<bool>,
}

impl Sieve {
    fn new(threshold: usize) -> Self {
        let mut composite = vec![false; threshold + 1];

        for i in 2..=threshold {
            if !composite[i] {
                let mut j = 2 * i;
                while j <= threshold {
                    composite[j] = true;
                    j += i;
                }
            }
        }

        Self { composite }
    }

    #[inline]
    fn is_composite(&self, idx: usize) -> bool {
        self.composite[idx]
    }
}

/// Output slots for one value, refusing to grow past `limit`.
struct FactorList {
    value: i64,
    limit: usize,
    factors: Vec<i64>,
}

impl FactorList {
    fn new(value: i64, limit: usize) -> Self {
        Self {
            value,
            limit,
            factors: Vec::with_capacity(limit.min(DEFAULT_MAX_FACTORS)),
        }
    }

    fn push(&mut self, factor: i64) -> Result<(), FactorError> {
        if self.factors.len() == self.limit {
            return Err(FactorError::ResourceExhaustion {
                value: self.value,
                limit: self.limit,
            });
        }
        self.factors.push(factor);
        Ok(())
    }
}

/// Sieve-assisted trial-division factorizer.
#[derive(Debug, Clone, Copy)]
pub struct Factorizer {
    max_factors: usize,
}

impl Default for Factorizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FACTORS)
    }
}

impl Factorizer {
    pub fn new(max_factors: usize) -> Self {
        Self { max_factors }
    }

    /// Prime factors of `num` in ascending order, repeated by multiplicity.
    ///
    /// Fails with `InvalidInput` for `num <= 1`, `OutOfRange` above
    /// [`MAX_VALUE`], and `ResourceExhaustion` when `num` has more prime
    /// factors than this factorizer has slots.
    pub fn factor(&self, num: i64) -> Result<Vec<i64>, FactorError> {
        if num <= 1 {
            return Err(FactorError::InvalidInput(num));
        }
        if num > MAX_VALUE {
            return Err(FactorError::OutOfRange {
                value: num,
                max: MAX_VALUE,
            });
        }

        let mut factors = FactorList::new(num, self.max_factors);

        if is_prime(num) {
            factors.push(num)?;
        } else {
            let sieve = Sieve::new(num.isqrt() as usize);
            trial_divide(num, &sieve, &mut factors)?;
        }

        Ok(factors.factors)
    }
}

/// Find the smallest prime divisor of composite `num`, then finish with the
/// cofactor: directly if it is prime, recursively otherwise.
///
/// Every recursive `num` is a divisor of the original value, so its square
/// root never exceeds the sieve's threshold.
fn trial_divide(num: i64, sieve: &Sieve, factors: &mut FactorList) -> Result<(), FactorError> {
    let threshold = num.isqrt() as usize;

    for i in 2..=threshold {
        if sieve.is_composite(i) {
            continue;
        }

        let prime = i as i64;

        if prime * prime == num {
            factors.push(prime)?;
            factors.push(prime)?;
            return Ok(());
        }

        if num % prime == 0 {
            factors.push(prime)?;

            let component = num / prime;
            if is_prime(component) {
                factors.push(component)?;
            } else {
                trial_divide(component, sieve, factors)?;
            }
            return Ok(());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(num: i64) -> Vec<i64> {
        Factorizer::default().factor(num).unwrap()
    }

    #[test]
    fn test_is_prime_small_values() {
        let primes: Vec<i64> = (-5..=50).filter(|&n| is_prime(n)).collect();
        assert_eq!(
            primes,
            vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47]
        );
    }

    #[test]
    fn test_is_prime_odd_squares() {
        // floor(sqrt) must be included in the divisor range
        assert!(!is_prime(9));
        assert!(!is_prime(25));
        assert!(!is_prime(10007 * 10007));
        assert!(is_prime(10007));
    }

    #[test]
    fn test_sieve_flags_composites() {
        let sieve = Sieve::new(30);
        let unflagged: Vec<usize> = (2..=30).filter(|&i| !sieve.is_composite(i)).collect();
        assert_eq!(unflagged, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        // The threshold itself is covered
        assert!(sieve.is_composite(30));
    }

    #[test]
    fn test_scenario_values() {
        assert_eq!(factor(2), vec![2]);
        assert_eq!(factor(3), vec![3]);
        assert_eq!(factor(4), vec![2, 2]);
        assert_eq!(factor(17), vec![17]);
        assert_eq!(factor(100), vec![2, 2, 5, 5]);
    }

    #[test]
    fn test_prime_is_its_own_factor() {
        for p in [2, 5, 97, 7919, 65_521, 1_000_003] {
            assert_eq!(factor(p), vec![p]);
        }
    }

    #[test]
    fn test_prime_squares() {
        for p in [2, 3, 7, 31, 10_007, 65_521] {
            assert_eq!(factor(p * p), vec![p, p], "factoring {}^2", p);
        }
    }

    #[test]
    fn test_product_sorted_and_prime() {
        // 63 slots fit every value up to 2^48
        let factorizer = Factorizer::new(64);
        for n in 2..=5000 {
            let factors = factorizer.factor(n).unwrap();
            assert_eq!(factors.iter().product::<i64>(), n, "product for {}", n);
            assert!(factors.windows(2).all(|w| w[0] <= w[1]), "order for {}", n);
            assert!(factors.iter().all(|&f| is_prime(f)), "primality for {}", n);
        }
    }

    #[test]
    fn test_default_slots_fail_only_past_ten_factors() {
        let roomy = Factorizer::new(64);
        let default = Factorizer::default();
        for n in 2..=5000 {
            let count = roomy.factor(n).unwrap().len();
            match default.factor(n) {
                Ok(factors) => assert!(count <= DEFAULT_MAX_FACTORS && factors.len() == count, "{}", n),
                Err(err) => {
                    assert!(count > DEFAULT_MAX_FACTORS, "{} has only {} factors", n, count);
                    assert_eq!(
                        err,
                        FactorError::ResourceExhaustion {
                            value: n,
                            limit: DEFAULT_MAX_FACTORS
                        }
                    );
                }
            }
        }
    }

    #[test]
    fn test_large_composites() {
        assert_eq!(factor(600_851_475_143), vec![71, 839, 1471, 6857]);
        assert_eq!(factor(1_000_003 * 1_000_033), vec![1_000_003, 1_000_033]);
        assert_eq!(factor(2 * 3 * 5 * 7 * 11 * 13 * 17), vec![2, 3, 5, 7, 11, 13, 17]);
    }

    #[test]
    fn test_invalid_input() {
        let factorizer = Factorizer::default();
        for n in [1, 0, -1, -12] {
            assert_eq!(factorizer.factor(n), Err(FactorError::InvalidInput(n)));
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            Factorizer::default().factor(MAX_VALUE + 1),
            Err(FactorError::OutOfRange {
                value: MAX_VALUE + 1,
                max: MAX_VALUE
            })
        );
    }

    #[test]
    fn test_factor_slots_exact_fit() {
        // 2^10 fills all ten default slots
        assert_eq!(factor(1024), vec![2; 10]);
    }

    #[test]
    fn test_factor_slots_exhausted() {
        let factorizer = Factorizer::default();
        assert_eq!(
            factorizer.factor(2048),
            Err(FactorError::ResourceExhaustion {
                value: 2048,
                limit: 10
            })
        );

        let roomy = Factorizer::new(16);
        assert_eq!(roomy.factor(2048).unwrap(), vec![2; 11]);
    }

    #[test]
    fn test_single_slot() {
        let factorizer = Factorizer::new(1);
        assert_eq!(factorizer.factor(13).unwrap(), vec![13]);
        assert!(matches!(
            factorizer.factor(6),
            Err(FactorError::ResourceExhaustion { value: 6, limit: 1 })
        ));
    }
}
