//! Outcome of a cursor move.

/// Whether a move changed the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    /// The cursor now sits on the target.
    Moved,
    /// The target does not exist; the cursor did not move.
    NotMoved,
}

impl Move {
    /// True for [`Move::Moved`].
    #[inline]
    pub fn has_moved(self) -> bool {
        self == Move::Moved
    }
}

impl From<bool> for Move {
    fn from(moved: bool) -> Self {
        if moved {
            Move::Moved
        } else {
            Move::NotMoved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_moved() {
        assert!(Move::Moved.has_moved());
        assert!(!Move::NotMoved.has_moved());
        assert_eq!(Move::from(true), Move::Moved);
        assert_eq!(Move::from(false), Move::NotMoved);
    }
}
