use std::fmt;

use nar_common::Location;

use crate::ty::Ty;

/// A constraint `left ≡ right`.
///
/// The location only feeds error reporting; it never affects solving.
#[derive(Clone, Debug)]
pub struct Equation {
    pub left: Ty,
    pub right: Ty,
    pub location: Location,
}

impl Equation {
    pub fn new(left: Ty, right: Ty, location: Location) -> Self {
        Equation {
            left,
            right,
            location,
        }
    }

    /// An equation derived from another one located at `enclosing`.
    ///
    /// Points at whichever side is a variable introduced inside the
    /// enclosing node, falling back to the node itself.
    pub fn best(left: Ty, right: Ty, enclosing: &Location) -> Self {
        let location = [&left, &right]
            .into_iter()
            .find_map(|side| match side {
                Ty::Unbound(var) if enclosing.contains(&var.location) => Some(var.location),
                _ => None,
            })
            .unwrap_or(*enclosing);
        Equation {
            left,
            right,
            location,
        }
    }

    /// Both sides are the same type.
    pub fn is_reflexive(&self) -> bool {
        self.left == self.right
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ≡ {}", self.left, self.right)
    }
}
