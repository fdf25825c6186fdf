//! Ownership and authentication checks gating every mutation.

use super::entities::{PostRecord, UserRecord};

/// Only the author of a post may edit it.
pub fn can_edit(post: &PostRecord, actor: Option<&UserRecord>) -> bool {
    actor.is_some_and(|user| user.id == post.author_id)
}

/// Creating posts, commenting and following require a signed-in user.
pub fn can_mutate(actor: Option<&UserRecord>) -> bool {
    actor.is_some()
}
