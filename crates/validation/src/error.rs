use std::fmt::{self, Display, Formatter};

use parser::Pos;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError {
    pub locations: Vec<Pos>,
    pub message: String,
}

impl Display for RuleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (idx, loc) in self.locations.iter().enumerate() {
            if idx == 0 {
                write!(f, "[")?;
            } else {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", loc.line, loc.column)?;
            if idx == self.locations.len() - 1 {
                write!(f, "] ")?;
            }
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RuleError {}
