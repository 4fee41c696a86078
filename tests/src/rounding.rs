// ============ Rounding Direction Tests ============
// Every division floors, and every floor lands on the pool's side.
// Each test computes the exact rational value alongside the library result
// and checks which way the remainder went.

use crate::harness::*;
use pairpool_engine::*;
use pairpool_math::liquidity::{amounts_for_shares, plan_deposit};
use pairpool_math::pricing::{amount_in_after_fee, get_amount_in, get_amount_out};
use pairpool_math::{isqrt, product_non_decreasing};

fn ceil_div(n: u128, d: u128) -> u128 {
    n.div_ceil(d)
}

// ============ Fee ============

#[test]
fn test_fee_deduction_floors() {
    // 150 * 9970 / 10000 = 149.55
    assert_eq!(amount_in_after_fee(150, 30), Ok(149));
    assert_eq!(ceil_div(150 * 9970, 10_000), 150);

    for amount in [1u64, 7, 99, 333, 10_001, 987_654_321] {
        for fee in [0u16, 1, 5, 30, 100, 9_999] {
            let exact_num = amount as u128 * (10_000 - fee as u128);
            let after = amount_in_after_fee(amount, fee).unwrap() as u128;
            assert_eq!(after, exact_num / 10_000);
            assert!(after * 10_000 <= exact_num);
        }
    }
}

// ============ Swap Output ============

#[test]
fn test_swap_output_floors() {
    let quote = get_amount_out(150, 1500, 1800, 30).unwrap();
    // 149 * 1800 / 1649 = 162.64
    assert_eq!(quote.amount_out, 162);
    assert_eq!(ceil_div(149 * 1800, 1649), 163);

    assert!(162 * 1649 <= 149 * 1800);
    assert!(163 * 1649 > 149 * 1800);
    assert!(product_non_decreasing(1500, 1800, 1650, 1800 - 162));
}

#[test]
fn test_output_rounding_vs_floored_remaining_reserve() {
    // Two ways to floor a constant-product trade:
    //   out = floor(x * r_out / (r_in + x))        (used)
    //   out = r_out - floor(r_in * r_out / (r_in + x))
    // The first never pays more than the second, and only the first keeps k.
    let mut diverged = 0;
    for r_in in [3u64, 17, 1_000, 65_537] {
        for r_out in [5u64, 29, 1_800, 99_991] {
            for x in [1u64, 2, 13, 500] {
                let used = get_amount_out(x, r_in, r_out, 0).unwrap().amount_out;
                let k = r_in as u128 * r_out as u128;
                let alt = r_out as u128 - k / (r_in as u128 + x as u128);

                assert!(used as u128 <= alt);
                assert!(product_non_decreasing(r_in, r_out, r_in + x, r_out - used));
                if (used as u128) < alt {
                    diverged += 1;
                    let alt_product = (r_in as u128 + x as u128) * (r_out as u128 - alt);
                    assert!(alt_product < k, "alt kept k at {r_in}/{r_out}/{x}");
                }
            }
        }
    }
    assert!(diverged > 0);
}

#[test]
fn test_engine_swap_matches_floor() {
    let mut engine = setup_pool(30, 1500, 1800);
    let receipt = engine.swap(BOB, &pool_key(), sell_x(150, 0)).unwrap();
    let exact_num = 149u128 * 1800;
    let exact_den = 1500u128 + 149;
    assert_eq!(receipt.amount_out as u128, exact_num / exact_den);
    assert!(receipt.amount_out as u128 * exact_den < exact_num);
}

// ============ Exact-Out Inverse ============

#[test]
fn test_amount_in_rounds_up_minimally() {
    for (r_in, r_out) in [(1500u64, 1800u64), (7, 11), (1_000_000, 3), (12_345, 67_890)] {
        for fee in [0u16, 30, 300] {
            for target in [1u64, 2, r_out / 3, r_out - 1] {
                if target == 0 || target >= r_out {
                    continue;
                }
                let needed = get_amount_in(target, r_in, r_out, fee).unwrap();
                let got = get_amount_out(needed, r_in, r_out, fee).unwrap().amount_out;
                assert!(got >= target, "{needed} buys {got} < {target}");
                if needed > 1 {
                    let short = get_amount_out(needed - 1, r_in, r_out, fee).unwrap().amount_out;
                    assert!(short < target, "{} already buys {target}", needed - 1);
                }
            }
        }
    }
}

// ============ Deposits ============

#[test]
fn test_bootstrap_shares_floor_sqrt() {
    let shares = isqrt(1000 * 1200);
    assert_eq!(shares, 1095);
    assert!(shares * shares <= 1_200_000);
    assert!((shares + 1) * (shares + 1) > 1_200_000);
}

#[test]
fn test_proportional_shares_floor() {
    let plan = plan_deposit(500, 1200, 1000, 1200, 1095).unwrap();
    // 500 * 1095 / 1000 = 547.5 on both sides
    assert_eq!(plan.shares, 547);
    assert_eq!(ceil_div(500 * 1095, 1000), 548);
}

#[test]
fn test_clamped_side_floors() {
    // 100 * 1201 / 1000 = 120.1, the caller keeps the dust
    let plan = plan_deposit(100, 500, 1000, 1201, 1095).unwrap();
    assert_eq!((plan.amount_low, plan.amount_high), (100, 120));
    // Shares follow the smaller, floored claim
    let from_low = 100 * 1095 / 1000;
    let from_high = 120 * 1095 / 1201;
    assert_eq!(plan.shares, from_low.min(from_high));
    assert!(plan.shares as u128 * 1201 <= 120 * 1095);
}

// ============ Withdrawals ============

#[test]
fn test_withdraw_amounts_floor() {
    // 1500 * 547 / 1642 = 499.69, 1800 * 547 / 1642 = 599.63
    assert_eq!(amounts_for_shares(547, 1500, 1800, 1642), Ok((499, 599)));
    assert_eq!(ceil_div(1500 * 547, 1642), 500);
    assert_eq!(ceil_div(1800 * 547, 1642), 600);
}

#[test]
fn test_withdraw_dust_leaves_remainder_in_pool() {
    let mut engine = setup_pool(30, 1000, 1200);
    engine.deposit(BOB, &pool_key(), 500, 600).unwrap();
    let before = pool(&engine);

    // One share is worth 0.91 X and 1.09 Y: BOB gets 0 X and 1 Y
    let receipt = engine.withdraw(BOB, &pool_key(), 1).unwrap();
    assert_eq!((receipt.amount_low, receipt.amount_high), (0, 1));

    let after = pool(&engine);
    assert_eq!(after.reserve_low, before.reserve_low);
    // What stays behind per share never drops
    assert!(
        after.reserve_low as u128 * before.total_shares as u128
            >= before.reserve_low as u128 * after.total_shares as u128
    );
    assert!(
        after.reserve_high as u128 * before.total_shares as u128
            >= before.reserve_high as u128 * after.total_shares as u128
    );
}
