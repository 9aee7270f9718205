//! SET option clause.
//!
//! The clause after `SET key value` is recognized by how many tokens it has,
//! not by free-form scanning:
//!
//! | tokens | form                                   |
//! |--------|----------------------------------------|
//! | 0      | plain set                              |
//! | 1      | `KEEPTTL`, `NX` or `XX`                |
//! | 2      | `EX <seconds>` or `PX <milliseconds>`  |
//! | 3      | `EX`/`PX <n>` followed by `NX` or `XX` |
//!
//! Tokens match case-insensitively.

use crate::commands::error::CommandError;
use crate::storage::{ExpiryOption, SetCondition, SetOptions};
use bytes::Bytes;
use std::time::{Duration, Instant};

impl SetOptions {
    /// Parses the tokens following `SET key value`. Durations are resolved to
    /// an absolute deadline relative to `now`.
    pub fn parse(tokens: &[Bytes], now: Instant) -> Result<Self, CommandError> {
        match tokens {
            [] => Ok(SetOptions::default()),
            [flag] => {
                if flag.eq_ignore_ascii_case(b"KEEPTTL") {
                    Ok(SetOptions {
                        expiry: ExpiryOption::Keep,
                        ..Default::default()
                    })
                } else {
                    Ok(SetOptions {
                        condition: parse_condition(flag)?,
                        ..Default::default()
                    })
                }
            }
            [unit, amount] => Ok(SetOptions {
                expiry: parse_expiry(unit, amount, now)?,
                ..Default::default()
            }),
            [unit, amount, flag] => Ok(SetOptions {
                expiry: parse_expiry(unit, amount, now)?,
                condition: parse_condition(flag)?,
            }),
            _ => Err(CommandError::Syntax),
        }
    }
}

fn parse_condition(flag: &[u8]) -> Result<SetCondition, CommandError> {
    if flag.eq_ignore_ascii_case(b"NX") {
        Ok(SetCondition::IfAbsent)
    } else if flag.eq_ignore_ascii_case(b"XX") {
        Ok(SetCondition::IfPresent)
    } else {
        Err(CommandError::Syntax)
    }
}

fn parse_expiry(unit: &[u8], amount: &[u8], now: Instant) -> Result<ExpiryOption, CommandError> {
    let to_duration: fn(u64) -> Duration = if unit.eq_ignore_ascii_case(b"EX") {
        Duration::from_secs
    } else if unit.eq_ignore_ascii_case(b"PX") {
        Duration::from_millis
    } else {
        return Err(CommandError::Syntax);
    };

    let amount: i64 = std::str::from_utf8(amount)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::Syntax)?;
    if amount <= 0 {
        return Err(CommandError::InvalidExpireTime("set"));
    }

    now.checked_add(to_duration(amount as u64))
        .map(ExpiryOption::At)
        .ok_or(CommandError::InvalidExpireTime("set"))
}
