use std::{fmt, str::FromStr, sync::Arc};

/// Reserved token meaning "no constraint at this level".
pub const ALL: &str = "all";

/// One level of an administrative selection: either everything or a concrete name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    #[default]
    All,
    Only(Arc<str>),
}

impl Scope {
    pub fn only(name: impl Into<Arc<str>>) -> Self { Scope::Only(name.into()) }

    #[inline] pub fn is_all(&self) -> bool { matches!(self, Scope::All) }

    #[inline] pub fn is_concrete(&self) -> bool { !self.is_all() }

    /// The concrete name, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        match self {
            Scope::All => None,
            Scope::Only(name) => Some(name),
        }
    }

    /// Exact-match test against a feature attribute. `All` imposes no constraint.
    #[inline]
    pub fn admits(&self, value: Option<&str>) -> bool {
        match self {
            Scope::All => true,
            Scope::Only(name) => value == Some(&**name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or(ALL))
    }
}

impl FromStr for Scope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == ALL { Scope::All } else { Scope::only(s) })
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        if s == ALL { Scope::All } else { Scope::only(s) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_token_parses_to_all() {
        assert_eq!(Scope::from("all"), Scope::All);
        assert_eq!("Semarang Barat".parse::<Scope>().unwrap(), Scope::only("Semarang Barat"));
    }

    #[test]
    fn admits_is_exact() {
        let s = Scope::only("Tembalang");
        assert!(s.admits(Some("Tembalang")));
        assert!(!s.admits(Some("tembalang")));
        assert!(!s.admits(None));
        assert!(Scope::All.admits(None));
    }

    #[test]
    fn display() {
        assert_eq!(Scope::All.to_string(), "all");
        assert_eq!(Scope::only("x").to_string(), "x");
    }
}
