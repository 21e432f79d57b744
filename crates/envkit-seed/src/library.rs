use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SeedError;

/// Numeric libraries whose generators can be seeded. Ordering is the
/// seeding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
    Python,
    Numpy,
    Pytorch,
    Tensorflow,
    Jax,
}

impl Library {
    pub const ALL: [Library; 5] = [
        Library::Python,
        Library::Numpy,
        Library::Pytorch,
        Library::Tensorflow,
        Library::Jax,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Library::Python => "python",
            Library::Numpy => "numpy",
            Library::Pytorch => "pytorch",
            Library::Tensorflow => "tensorflow",
            Library::Jax => "jax",
        }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Library {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Library::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SeedError::UnknownLibrary(s.to_string()))
    }
}
