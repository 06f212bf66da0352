use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Monetary amount in the currency of the selected provider.
pub type Cost = Quantity<0, 0, 1>;

impl Display for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl Debug for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}¤", self.0)
    }
}
