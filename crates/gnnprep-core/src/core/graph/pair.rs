use std::fmt;

/// An unordered pair of two items.
///
/// The items are stored in sorted order, so `Pair::new(a, b) == Pair::new(b, a)` and both hash
/// identically. This makes pairs safe to collect into sets without double counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair<T> {
    first: T,
    second: T,
}

impl<T: Ord + Copy> Pair<T> {
    pub fn new(a: T, b: T) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    /// The smaller item.
    pub fn first(&self) -> T {
        self.first
    }

    /// The larger item.
    pub fn second(&self) -> T {
        self.second
    }

    pub fn items(&self) -> [T; 2] {
        [self.first, self.second]
    }

    pub fn contains(&self, item: T) -> bool {
        self.first == item || self.second == item
    }

    /// The item opposite `item`, or `None` if `item` is not part of the pair.
    pub fn other(&self, item: T) -> Option<T> {
        if self.first == item {
            Some(self.second)
        } else if self.second == item {
            Some(self.first)
        } else {
            None
        }
    }

    pub fn map<U: Ord + Copy>(&self, mut f: impl FnMut(T) -> U) -> Pair<U> {
        Pair::new(f(self.first), f(self.second))
    }
}

impl<T: fmt::Display> fmt::Display for Pair<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}
