use core::fmt::Debug;

use num_bigint::BigInt;

use crate::WorldOffset;
use crate::node::NodeId;
use crate::table::NodeTable;

const MASK_LEFT: u8 = 1;
const MASK_TOP: u8 = 2;
const MASK_RIGHT: u8 = 4;
const MASK_BOTTOM: u8 = 8;
const MASK_ALL: u8 = MASK_LEFT | MASK_TOP | MASK_RIGHT | MASK_BOTTOM;

/// `2^n` as a big integer
pub fn pow2(n: u32) -> BigInt {
    BigInt::from(1) << n
}

/// An inclusive rectangle of cells. `y` grows downwards, so `top <= bottom`.
#[derive(Clone, PartialEq, Eq)]
pub struct Bounds {
    pub top: BigInt,
    pub left: BigInt,
    pub bottom: BigInt,
    pub right: BigInt,
}

impl Bounds {
    /// The degenerate rectangle at the origin, reported for an empty universe.
    pub fn zero() -> Self {
        Self::point(BigInt::ZERO, BigInt::ZERO)
    }

    pub fn point(x: BigInt, y: BigInt) -> Self {
        Bounds {
            top: y.clone(),
            left: x.clone(),
            bottom: y,
            right: x,
        }
    }

    /// Create bounds from a list of cells. An empty list gives [`Bounds::zero`].
    pub fn from_points(points: &[(WorldOffset, WorldOffset)]) -> Self {
        let Some((&(x, y), rest)) = points.split_first() else {
            return Self::zero();
        };

        let mut b = Bounds::point(x.into(), y.into());
        for &(x, y) in rest {
            b.add(&x.into(), &y.into());
        }

        b
    }

    /// Grow the rectangle to include `(x, y)`.
    pub fn add(&mut self, x: &BigInt, y: &BigInt) {
        if *x < self.left {
            self.left = x.clone();
        }
        if *x > self.right {
            self.right = x.clone();
        }
        if *y < self.top {
            self.top = y.clone();
        }
        if *y > self.bottom {
            self.bottom = y.clone();
        }
    }

    pub fn width(&self) -> BigInt {
        &self.right - &self.left + 1
    }

    pub fn height(&self) -> BigInt {
        &self.bottom - &self.top + 1
    }

    /// Smallest root level, never below 3, whose square `[-2^(L-1), 2^(L-1))` holds these bounds.
    pub fn level(&self) -> u32 {
        let mut max = BigInt::from(4);

        for c in [&self.top, &self.left, &self.bottom, &self.right] {
            let needed = if c.sign() == num_bigint::Sign::Minus {
                -c
            } else {
                c + 1
            };

            if needed > max {
                max = needed;
            }
        }

        // ceil(log2(max)), valid since max >= 4
        let ceil_log2 = (max - BigInt::from(1)).bits() as u32;

        ceil_log2 + 1
    }
}

impl Debug for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(top: {}, left: {}, bottom: {}, right: {})",
            self.top, self.left, self.bottom, self.right
        )
    }
}

/// Minimal bounding box of the live cells under `root`, where `root` is centered on the
/// origin. An empty tree gives [`Bounds::zero`].
pub(crate) fn compute_bounds(table: &NodeTable, root: NodeId) -> Bounds {
    let node = table.node(root);
    if node.is_empty() {
        return Bounds::zero();
    }

    let offset = pow2(node.level().saturating_sub(1));
    if node.is_leaf() {
        return Bounds::zero();
    }

    // Start inverted at the far edges so the first live cell snaps every edge to itself.
    let mut bounds = Bounds {
        top: offset.clone(),
        left: offset.clone(),
        bottom: -&offset,
        right: -&offset,
    };

    let origin = -offset;
    search(table, root, &origin, &origin, MASK_ALL, &mut bounds);

    bounds
}

/// Each bit of `find` marks an edge this subtree could still push outwards.
fn search(table: &NodeTable, id: NodeId, left: &BigInt, top: &BigInt, find: u8, b: &mut Bounds) {
    let node = table.node(id);
    if node.is_empty() || find == 0 {
        return;
    }

    let Some(q) = node.children() else {
        b.add(left, top);
        return;
    };

    let size = pow2(node.level());
    if *left >= b.left && left + &size - 1 <= b.right && *top >= b.top && top + &size - 1 <= b.bottom
    {
        // already inside what we've found
        return;
    }

    let (mut find_nw, mut find_ne, mut find_sw, mut find_se) = (find, find, find, find);

    // A live quadrant settles the edges it shares with the square for its siblings on the
    // other side of it.
    if !table.node(q.nw).is_empty() {
        find_sw &= !MASK_TOP;
        find_ne &= !MASK_LEFT;
        find_se &= !(MASK_TOP | MASK_LEFT);
    }
    if !table.node(q.sw).is_empty() {
        find_se &= !MASK_LEFT;
        find_nw &= !MASK_BOTTOM;
        find_ne &= !(MASK_BOTTOM | MASK_LEFT);
    }
    if !table.node(q.ne).is_empty() {
        find_nw &= !MASK_RIGHT;
        find_se &= !MASK_TOP;
        find_sw &= !(MASK_TOP | MASK_RIGHT);
    }
    if !table.node(q.se).is_empty() {
        find_sw &= !MASK_RIGHT;
        find_ne &= !MASK_BOTTOM;
        find_nw &= !(MASK_BOTTOM | MASK_RIGHT);
    }

    let half = pow2(node.level() - 1);
    let (mid_x, mid_y) = (left + &half, top + &half);

    search(table, q.nw, left, top, find_nw, b);
    search(table, q.sw, left, &mid_y, find_sw, b);
    search(table, q.ne, &mid_x, top, find_ne, b);
    search(table, q.se, &mid_x, &mid_y, find_se, b);
}
