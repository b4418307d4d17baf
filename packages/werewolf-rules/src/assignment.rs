//! Role pool construction and random role assignment.

use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::RoleCatalog;
use crate::error::GameError;
use crate::player::{PlayerState, UserId};

/// Builds the role pool for `member_count` players.
///
/// Each configured role is repeated by its count (in key order), then the pool is
/// padded with `filler` up to the member count. A configuration that asks for
/// more roles than there are members is rejected; the pool is never truncated.
pub fn build_role_pool(
    catalog: &RoleCatalog,
    config: &BTreeMap<String, u32>,
    member_count: usize,
    filler: &str,
) -> Result<Vec<String>, GameError> {
    catalog.require(filler)?;

    // 展開する前に合計を確かめる
    let mut total: usize = 0;
    for (key, count) in config {
        catalog.require(key)?;
        total = usize::try_from(*count)
            .ok()
            .and_then(|count| total.checked_add(count))
            .ok_or_else(|| GameError::Config("role counts overflow".to_string()))?;
    }
    if total > member_count {
        return Err(GameError::Config(format!(
            "{} roles configured for {} members",
            total, member_count
        )));
    }

    let mut pool = Vec::with_capacity(member_count);
    for (key, count) in config {
        pool.extend(std::iter::repeat(key.clone()).take(*count as usize));
    }

    pool.resize(member_count, filler.to_string());
    Ok(pool)
}

/// Pairs shuffled members with a shuffled pool by position.
///
/// Both sides are permuted independently with Fisher-Yates driven by `rng`, so a
/// seeded generator gives a reproducible assignment.
pub fn assign_roles<R: Rng + ?Sized>(
    members: &[UserId],
    pool: &[String],
    rng: &mut R,
) -> Result<Vec<PlayerState>, GameError> {
    if members.len() != pool.len() {
        return Err(GameError::Config(format!(
            "role pool has {} roles for {} members",
            pool.len(),
            members.len()
        )));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = members.iter().find(|id| !seen.insert(**id)) {
        return Err(GameError::Config(format!("member {} listed twice", dup)));
    }

    let mut members = members.to_vec();
    let mut pool = pool.to_vec();
    members.shuffle(rng);
    pool.shuffle(rng);

    Ok(members
        .into_iter()
        .zip(pool)
        .map(|(user_id, role_key)| PlayerState::new(user_id, role_key))
        .collect())
}
