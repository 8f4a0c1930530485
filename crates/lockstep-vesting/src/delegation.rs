//! Staking helpers: aggregate delegated amounts and move staking positions
//! between delegators without passing through the bank.
//!
//! Transfers never touch validator pools: tokens stay bonded or unbonding,
//! only ownership changes.

use tracing::debug;

use lockstep_core::address::Address;
use lockstep_core::error::LockstepError;
use lockstep_core::math::Dec;
use lockstep_core::staking::Delegation;
use lockstep_core::traits::StakingKeeper;

/// Tokens `delegator` has bonded, summed over delegations whose validator
/// still exists. Each delegation is valued truncated then rounded to an
/// integer.
pub fn delegator_bonded(
    staking: &dyn StakingKeeper,
    delegator: &Address,
    max: u16,
) -> Result<u128, LockstepError> {
    let mut bonded: u128 = 0;
    for delegation in staking.delegator_delegations(delegator, max)? {
        let Some(validator) = staking.validator(&delegation.validator)? else {
            continue;
        };
        let tokens = validator.tokens_from_shares_truncated(delegation.shares)?.round_int()?;
        bonded = bonded.saturating_add(tokens);
    }
    Ok(bonded)
}

/// Tokens `delegator` has in unbonding entries.
pub fn delegator_unbonding(
    staking: &dyn StakingKeeper,
    delegator: &Address,
    max: u16,
) -> Result<u128, LockstepError> {
    Ok(staking
        .delegator_unbonding_delegations(delegator, max)?
        .iter()
        .fold(0u128, |acc, ubd| acc.saturating_add(ubd.total_balance())))
}

/// Reassign unbonding entries with `validator` from `from` to `to` until
/// `want` tokens have moved or the receiver hits the entry cap.
///
/// Partially consumed entries are split; the receiver's entry keeps the
/// original creation height and completion time. Returns the tokens moved.
pub fn transfer_unbonding(
    staking: &mut dyn StakingKeeper,
    from: &Address,
    to: &Address,
    validator: &Address,
    mut want: u128,
) -> Result<u128, LockstepError> {
    let Some(mut ubd_from) = staking.unbonding_delegation(from, validator)? else {
        return Ok(0);
    };
    let mut transferred: u128 = 0;
    let mut modified = false;

    let mut i = 0;
    while i < ubd_from.entries.len() && want > 0 {
        let entry = ubd_from.entries[i].clone();
        let to_xfer = entry.balance.min(want);
        if to_xfer == 0 {
            i += 1;
            continue;
        }
        if staking.has_max_unbonding_delegation_entries(to, validator)? {
            debug!(%to, %validator, "receiver at unbonding entry cap");
            break;
        }
        staking.set_unbonding_delegation_entry(
            to,
            validator,
            entry.creation_height,
            entry.completion_time,
            to_xfer,
        )?;
        transferred += to_xfer;
        want -= to_xfer;
        modified = true;

        let remaining = entry.balance - to_xfer;
        if remaining == 0 {
            ubd_from.entries.remove(i);
        } else {
            ubd_from.entries[i].balance = remaining;
            i += 1;
        }
    }

    if modified {
        if ubd_from.entries.is_empty() {
            staking.remove_unbonding_delegation(from, validator)?;
        } else {
            staking.set_unbonding_delegation(ubd_from)?;
        }
    }
    Ok(transferred)
}

/// Move up to `want_shares` of `from`'s delegation to `validator` over to
/// `to`. Returns the shares actually moved.
///
/// Redelegations into `validator` must stay backed by shares. Entries the
/// sender can no longer cover move with the shares, split proportionally
/// where needed. When the receiver could overflow its redelegation entry cap
/// nothing is moved.
pub fn transfer_delegation(
    staking: &mut dyn StakingKeeper,
    from: &Address,
    to: &Address,
    validator: &Address,
    want_shares: Dec,
    max: u16,
) -> Result<Dec, LockstepError> {
    if want_shares.is_zero() || staking.validator(validator)?.is_none() {
        return Ok(Dec::ZERO);
    }
    let Some(mut del_from) = staking.delegation(from, validator)? else {
        return Ok(Dec::ZERO);
    };

    // Worst case every redelegation entry into `validator` has to move.
    let max_entries = staking.max_entries() as usize;
    let redelegations: Vec<_> = staking
        .delegator_redelegations(from, max)?
        .into_iter()
        .filter(|red| red.validator_dst == *validator)
        .collect();
    for red in &redelegations {
        if let Some(existing) = staking.redelegation(to, &red.validator_src, &red.validator_dst)? {
            if existing.entries.len() + red.entries.len() >= max_entries {
                debug!(%to, src = %red.validator_src, dst = %red.validator_dst,
                    "receiver could exceed redelegation entry cap");
                return Ok(Dec::ZERO);
            }
        }
    }

    let transferred = del_from.shares.min(want_shares);
    let mut remaining = del_from.shares.saturating_sub(transferred);

    let mut del_to = staking.delegation(to, validator)?.unwrap_or(Delegation {
        delegator: *to,
        validator: *validator,
        shares: Dec::ZERO,
    });
    del_to.shares = del_to.shares.checked_add(transferred)?;
    staking.set_delegation(del_to)?;

    if remaining.is_zero() {
        staking.remove_delegation(from, validator)?;
    } else {
        del_from.shares = remaining;
        staking.set_delegation(del_from)?;
    }

    for mut red in redelegations {
        let mut modified = false;
        let mut kept = Vec::with_capacity(red.entries.len());
        for mut entry in red.entries.drain(..) {
            let keep = entry.shares_dst.min(remaining);
            let send = entry.shares_dst.saturating_sub(keep);
            remaining = remaining.saturating_sub(keep);

            if send.is_zero() {
                kept.push(entry);
                continue;
            }
            modified = true;
            if keep.is_zero() {
                staking.set_redelegation_entry(
                    to,
                    &red.validator_src,
                    &red.validator_dst,
                    entry.creation_height,
                    entry.completion_time,
                    entry.initial_balance,
                    send,
                )?;
            } else {
                let balance_to_send = send
                    .mul_int_quo_truncated(entry.initial_balance, entry.shares_dst)?
                    .truncate_int()?;
                staking.set_redelegation_entry(
                    to,
                    &red.validator_src,
                    &red.validator_dst,
                    entry.creation_height,
                    entry.completion_time,
                    balance_to_send,
                    send,
                )?;
                entry.initial_balance -= balance_to_send;
                entry.shares_dst = keep;
                kept.push(entry);
            }
        }
        if modified {
            if kept.is_empty() {
                staking.remove_redelegation(from, &red.validator_src, &red.validator_dst)?;
            } else {
                red.entries = kept;
                staking.set_redelegation(red)?;
            }
        }
    }

    Ok(transferred)
}
