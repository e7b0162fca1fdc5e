use rand::Rng;

use bindery_types::models::Member;

use crate::lifecycle::LifecycleError;

/// Uniform-random pick of the next selector. Only meaningful while the club
/// is idle or the current book is in a terminal state; the caller owns that
/// check since spinning is allowed to re-run until the wheel lands well.
pub fn spin_wheel<'a, R: Rng>(
    members: &'a [Member],
    rng: &mut R,
) -> Result<&'a Member, LifecycleError> {
    if members.is_empty() {
        return Err(LifecycleError::NoMembers);
    }
    Ok(&members[rng.random_range(0..members.len())])
}

/// Explicit pick (the UI restricts this to the club owner).
pub fn select_next_reader<'a>(
    members: &'a [Member],
    member_id: &str,
) -> Result<&'a Member, LifecycleError> {
    members
        .iter()
        .find(|m| m.id == member_id)
        .ok_or_else(|| LifecycleError::NotFound(format!("member {member_id}")))
}
