use bitflags::bitflags;

use crate::extract::expression::expression_match;

bitflags! {
    /// Processor architectures recognized by the `ArchitecturesAllowed`/
    /// `ArchitecturesInstallIn64BitMode` boolean expressions introduced in Inno Setup 6.3,
    /// replacing the fixed [`StoredArchitecture`] bitfield.
    ///
    /// <https://jrsoftware.org/ishelp/index.php?topic=setup_architecturesallowed>
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Architecture: u8 {
        const X86 = 1;
        const AMD64 = 1 << 1;
        const ARM64 = 1 << 2;
    }

    /// Pre-6.3 fixed bitfield form of the same concept, read as a single byte.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct StoredArchitecture: u8 {
        const X86 = 1;
        const AMD64 = 1 << 1;
        const IA64 = 1 << 2;
    }
}

impl From<StoredArchitecture> for Architecture {
    /// Itanium (`IA64`) has no counterpart in the modern flag set; Inno Setup dropped Itanium
    /// support in 6.3 alongside the fixed bitfield this type replaces.
    fn from(stored: StoredArchitecture) -> Self {
        let mut architecture = Self::empty();
        architecture.set(Self::X86, stored.contains(StoredArchitecture::X86));
        architecture.set(Self::AMD64, stored.contains(StoredArchitecture::AMD64));
        architecture
    }
}

impl Architecture {
    /// Canonical identifier for each flag, as it appears in an `ArchitecturesAllowed` expression.
    const NAMED: [(Self, &'static str); 3] =
        [(Self::X86, "x86"), (Self::AMD64, "amd64"), (Self::ARM64, "arm64")];

    /// Aliases accepted by Inno Setup 6.3+ expressions alongside the canonical names above.
    const ALIASES: [(Self, &'static str); 2] =
        [(Self::AMD64, "x64compatible"), (Self::AMD64, "x64os")];

    /// Evaluates an `ArchitecturesAllowed`-style expression against every known architecture
    /// identifier, returning `(allowed, disallowed)`.
    ///
    /// This reuses the same `and`/`or`/`not` expression grammar the installer uses for its
    /// `components`/`tasks` gating (`extract::expression`), since Inno Setup's architecture
    /// expressions share that grammar; each candidate architecture is tested as the one
    /// identifier assigned `true`, exactly as [`expression_match`] is documented to do.
    #[must_use]
    pub fn from_expression(expr: &str) -> (Self, Self) {
        let mut allowed = Self::empty();

        for (flag, name) in Self::NAMED {
            if expression_match(name, expr) {
                allowed |= flag;
            }
        }
        for (flag, name) in Self::ALIASES {
            if expression_match(name, expr) {
                allowed |= flag;
            }
        }

        (allowed, Self::all().difference(allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::{Architecture, StoredArchitecture};

    #[test]
    fn stored_architecture_maps_known_bits() {
        let stored = StoredArchitecture::X86 | StoredArchitecture::AMD64;
        let architecture = Architecture::from(stored);
        assert!(architecture.contains(Architecture::X86));
        assert!(architecture.contains(Architecture::AMD64));
        assert!(!architecture.contains(Architecture::ARM64));
    }

    #[test]
    fn expression_splits_allowed_and_disallowed() {
        let (allowed, disallowed) = Architecture::from_expression("not x86");
        assert!(!allowed.contains(Architecture::X86));
        assert!(allowed.contains(Architecture::AMD64));
        assert!(allowed.contains(Architecture::ARM64));
        assert!(disallowed.contains(Architecture::X86));
    }

    #[test]
    fn amd64_alias_is_recognized() {
        let (allowed, _) = Architecture::from_expression("x64compatible");
        assert!(allowed.contains(Architecture::AMD64));
    }
}
