use uuid::Uuid;

use crate::model::{GameScore, GlobalScore};

/// Anything that can sit in a ranked table.
pub trait Scored {
    fn points(&self) -> u32;
    fn owner(&self) -> Option<Uuid>;
}

impl Scored for GameScore {
    fn points(&self) -> u32 {
        self.score
    }

    fn owner(&self) -> Option<Uuid> {
        self.profile_id
    }
}

impl Scored for GlobalScore {
    fn points(&self) -> u32 {
        self.score
    }

    fn owner(&self) -> Option<Uuid> {
        Some(self.profile_id)
    }
}

/// Highest first. The sort is stable, so equal scores keep their order.
pub fn sort_by_score<T: Scored>(entries: &mut [T]) {
    entries.sort_by(|a, b| b.points().cmp(&a.points()));
}

/// 1-based position of the owner's best entry in an already sorted table.
pub fn rank_of<T: Scored>(sorted: &[T], owner: Uuid) -> Option<usize> {
    sorted
        .iter()
        .position(|entry| entry.owner() == Some(owner))
        .map(|index| index + 1)
}
