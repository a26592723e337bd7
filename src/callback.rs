//! # Sample callback
//!
//! A prime-counting load callback, standing in for a real subscription
//! callback. Grounded on `demo.c`'s `isPrime`/`routine`, which counts
//! primes below a fixed bound as a CPU-bound workload. Deliberately slow
//! enough that preemption and resumption are observable — a no-op
//! callback would never give the scheduler anything to preempt.

use tracing::info;

/// Counts primes below `n as u32 * SCALE`, logging the result. `n` is the
/// one-byte wire payload delivered with the request; scaling it keeps a
/// `u8` payload (0–255) mapped onto a workload large enough to take a
/// perceptible, preemptible amount of wall-clock time.
const SCALE: u32 = 20_000;

pub fn count_primes(n: u8) {
    let bound = n as u32 * SCALE;
    let start = std::time::Instant::now();

    let mut count = 0u32;
    for candidate in 2..bound {
        if is_prime(candidate) {
            count += 1;
        }
    }

    info!(
        payload = n,
        bound, count, elapsed_ms = start.elapsed().as_millis() as u64,
        "count_primes finished"
    );
}

/// Trial division up to `sqrt(p)`, exactly as `demo.c`'s `isPrime`.
fn is_prime(p: u32) -> bool {
    if p < 2 {
        return false;
    }
    if p == 2 {
        return true;
    }
    if p % 2 == 0 {
        return false;
    }
    let root = (p as f64).sqrt() as u32 + 1;
    let mut i = 3;
    while i < root {
        if p % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_primes() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(!is_prime(4));
        assert!(is_prime(13));
        assert!(!is_prime(15));
        assert!(is_prime(97));
    }

    #[test]
    fn count_primes_does_not_panic_on_zero_payload() {
        count_primes(0);
    }
}
