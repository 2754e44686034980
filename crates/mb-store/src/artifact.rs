use std::fmt;

/// The three artifacts that make up a benchmark workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactRole {
    /// Left operand.
    A,
    /// Right operand.
    B,
    /// Ground-truth product of `A @ B`.
    Reference,
}

impl ArtifactRole {
    pub const ALL: [ArtifactRole; 3] = [ArtifactRole::A, ArtifactRole::B, ArtifactRole::Reference];

    /// The stable name the artifact is stored under.
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactRole::A => "A",
            ArtifactRole::B => "B",
            ArtifactRole::Reference => "C_reference",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
