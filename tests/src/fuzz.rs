// ============ Pairpool Fuzz / Property-Based Tests ============
// Manual property-based testing using a deterministic PRNG.
// Reproducible from the seed alone.
//
// Each test generates hundreds of random inputs or operation sequences and
// checks invariants that must hold for all of them.

use crate::harness::*;
use pairpool_engine::*;
use pairpool_math::liquidity::{amounts_for_shares, plan_deposit};
use pairpool_math::pricing::{get_amount_in, get_amount_out};
use pairpool_math::product_non_decreasing;

// ============ Deterministic PRNG ============

struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn range_u64(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        min + (self.next_u64() % (max - min))
    }

    /// Log-uniform in [1, 2^bits), so small and large magnitudes both show up
    fn magnitude(&mut self, bits: u32) -> u64 {
        let width = self.range_u64(1, bits as u64 + 1) as u32;
        let max = if width >= 64 { u64::MAX } else { 1u64 << width };
        self.range_u64(1, max)
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}

// ============ Test 1: Constant Product Invariant ============

#[test]
fn test_fuzz_constant_product_invariant() {
    let mut rng = TestRng::new(0xDEAD_BEEF_CAFE_0001);

    for i in 0..2000 {
        let r_in = rng.magnitude(60);
        let r_out = rng.magnitude(60);
        let amount_in = rng.magnitude(60);
        let fee = rng.range_u64(0, 1000) as u16;

        let quote = match get_amount_out(amount_in, r_in, r_out, fee) {
            Ok(quote) => quote,
            Err(_) => continue,
        };
        assert!(quote.amount_out < r_out, "iteration {i}: drained reserve");
        assert_eq!(quote.amount_in_after_fee + quote.fee_amount, amount_in);

        let Some(new_in) = r_in.checked_add(amount_in) else {
            continue;
        };
        assert!(
            product_non_decreasing(r_in, r_out, new_in, r_out - quote.amount_out),
            "iteration {i}: k decreased, r_in={r_in} r_out={r_out} in={amount_in} out={}",
            quote.amount_out
        );
    }
}

// ============ Test 2: Exact-Out Inverse ============

#[test]
fn test_fuzz_amount_in_is_minimal() {
    let mut rng = TestRng::new(0x0000_0000_1234_5678);

    for i in 0..2000 {
        let r_in = rng.magnitude(48);
        let r_out = rng.range_u64(2, 1 << 40);
        let target = rng.range_u64(1, r_out);
        let fee = rng.range_u64(0, 500) as u16;

        let needed = match get_amount_in(target, r_in, r_out, fee) {
            Ok(needed) => needed,
            Err(_) => continue,
        };
        let got = get_amount_out(needed, r_in, r_out, fee).unwrap().amount_out;
        assert!(got >= target, "iteration {i}: {needed} buys {got} < {target}");

        if needed > 1 {
            let short = get_amount_out(needed - 1, r_in, r_out, fee)
                .unwrap()
                .amount_out;
            assert!(short < target, "iteration {i}: {} already buys {target}", needed - 1);
        }
    }
}

// ============ Test 3: Deposit Never Over-Mints ============

#[test]
fn test_fuzz_deposit_shares_bounded_by_contribution() {
    let mut rng = TestRng::new(0xFEED_FACE_0000_0003);

    for i in 0..2000 {
        let reserve_low = rng.magnitude(50);
        let reserve_high = rng.magnitude(50);
        let total = rng.magnitude(50);
        let desired_low = rng.magnitude(40);
        let desired_high = rng.magnitude(40);

        let plan = match plan_deposit(desired_low, desired_high, reserve_low, reserve_high, total) {
            Ok(plan) => plan,
            Err(_) => continue,
        };
        assert!(!plan.bootstrap);
        assert!(plan.amount_low <= desired_low && plan.amount_high <= desired_high);

        let minted = plan.shares as u128;
        let total = total as u128;
        assert!(
            minted * reserve_low as u128 <= plan.amount_low as u128 * total,
            "iteration {i}: low side over-minted"
        );
        assert!(
            minted * reserve_high as u128 <= plan.amount_high as u128 * total,
            "iteration {i}: high side over-minted"
        );
    }
}

// ============ Test 4: Withdraw Never Over-Pays ============

#[test]
fn test_fuzz_withdraw_bounded_by_claim() {
    let mut rng = TestRng::new(0xABCD_0000_0000_0004);

    for i in 0..2000 {
        let reserve_low = rng.magnitude(62);
        let reserve_high = rng.magnitude(62);
        let total = rng.magnitude(62);
        let shares = rng.range_u64(0, total + 1);

        let (low, high) = amounts_for_shares(shares, reserve_low, reserve_high, total).unwrap();
        assert!(low as u128 * total as u128 <= reserve_low as u128 * shares as u128, "iteration {i}");
        assert!(high as u128 * total as u128 <= reserve_high as u128 * shares as u128, "iteration {i}");
        if shares == total {
            assert_eq!((low, high), (reserve_low, reserve_high));
        }
    }
}

// ============ Test 5: Random Operation Sequences ============

fn run_sequence(seed: u64, fee_bps: u16, minimum_liquidity: u64) {
    let mut rng = TestRng::new(seed);
    let config = EngineConfig {
        minimum_liquidity,
        ..EngineConfig::default()
    };
    let mut engine = setup_with(config, fee_bps);
    fund(&mut engine, CAROL, FUNDING);
    let users = [ALICE, BOB, CAROL];

    for step in 0..400 {
        let user = users[rng.range_u64(0, 3) as usize];
        let before = pool(&engine);

        let result = match rng.range_u64(0, 10) {
            0..=2 => {
                let desired_low = rng.magnitude(30);
                let desired_high = rng.magnitude(30);
                engine
                    .deposit(user, &pool_key(), desired_low, desired_high)
                    .map(|r| (r.reserve_low, r.reserve_high))
            }
            3..=4 => {
                let held = shares_of(&engine, &user);
                let shares = if rng.chance(20) { held } else { rng.range_u64(1, held + 2) };
                engine
                    .withdraw(user, &pool_key(), shares)
                    .map(|r| (r.reserve_low, r.reserve_high))
            }
            _ => {
                let amount = rng.magnitude(28);
                let intent = if rng.chance(50) {
                    sell_x(amount, 0)
                } else {
                    sell_y(amount, 0)
                };
                engine
                    .swap(user, &pool_key(), intent)
                    .map(|r| (r.reserve_low, r.reserve_high))
            }
        };

        let after = pool(&engine);
        match result {
            Ok(reserves) => {
                assert_eq!(reserves, (after.reserve_low, after.reserve_high), "step {step}");
                if after.total_shares == before.total_shares {
                    assert!(product(&after) >= product(&before), "step {step}: k fell");
                }
            }
            // Rejected operations leave no trace
            Err(_) => assert_eq!(after, before, "step {step}"),
        }
        if after.is_empty() {
            assert_eq!(after.locked_shares, 0, "step {step}");
        }
        assert_books_balance(&engine);
    }
}

#[test]
fn test_fuzz_operation_sequences() {
    run_sequence(0x5EED_0000_0000_0001, 30, 0);
    run_sequence(0x5EED_0000_0000_0002, 0, 0);
    run_sequence(0x5EED_0000_0000_0003, 100, 0);
}

#[test]
fn test_fuzz_operation_sequences_with_locked_liquidity() {
    run_sequence(0x5EED_0000_0000_0011, 30, 1_000);
    run_sequence(0x5EED_0000_0000_0012, 5, 10);
}

// ============ Test 6: Value Per Share Never Falls ============

#[test]
fn test_fuzz_share_value_monotone() {
    let mut rng = TestRng::new(0x0000_0000_0000_0006);
    let mut engine = setup_pool(30, 10_000_000, 25_000_000);

    // sqrt(k) / total_shares, compared squared
    let value = |pool: &PoolData| (product(pool), pool.total_shares as u128);
    let (mut k, mut total) = value(&pool(&engine));

    for step in 0..500 {
        let user = if rng.chance(50) { ALICE } else { BOB };
        match rng.range_u64(0, 4) {
            0 => {
                let amount = rng.magnitude(24);
                let _ = engine.deposit(user, &pool_key(), amount, amount * 2);
            }
            1 => {
                let held = shares_of(&engine, &user);
                if held > 1 {
                    let _ = engine.withdraw(user, &pool_key(), rng.range_u64(1, held));
                }
            }
            _ => {
                let amount = rng.magnitude(22);
                let intent = if rng.chance(50) { sell_x(amount, 0) } else { sell_y(amount, 0) };
                let _ = engine.swap(user, &pool_key(), intent);
            }
        }

        let (next_k, next_total) = value(&pool(&engine));
        if next_total == 0 {
            break;
        }
        // k' / t'^2 >= k / t^2  <=>  k' * t^2 >= k * t'^2
        let lhs = next_k.checked_mul(total * total);
        let rhs = k.checked_mul(next_total * next_total);
        if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
            assert!(lhs >= rhs, "step {step}: value per share fell");
        }
        k = next_k;
        total = next_total;
    }
}
