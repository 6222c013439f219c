//! Statement kinds and registry keys.

/// Residual statement slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResidualKind {
    /// Volume term tested with the test-function value.
    F0,
    /// Volume term tested with the test-function gradient.
    F1,
    /// Boundary term tested with the test-function value.
    BndF0,
    /// Boundary term tested with the test-function gradient.
    BndF1,
}

impl ResidualKind {
    pub const ALL: [ResidualKind; 4] = [Self::F0, Self::F1, Self::BndF0, Self::BndF1];

    pub fn domain(self) -> Domain {
        match self {
            Self::F0 | Self::F1 => Domain::Volume,
            Self::BndF0 | Self::BndF1 => Domain::Boundary,
        }
    }
}

/// Jacobian statement slots.
///
/// `G0`: test value x basis value, `G1`: test value x basis gradient,
/// `G2`: test gradient x basis value, `G3`: test gradient x basis gradient.
/// `Gp*` are the same terms for a separate preconditioner matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JacobianKind {
    G0,
    G1,
    G2,
    G3,
    Gp0,
    Gp1,
    Gp2,
    Gp3,
    BndG0,
    BndG1,
    BndG2,
    BndG3,
}

impl JacobianKind {
    pub const ALL: [JacobianKind; 12] = [
        Self::G0,
        Self::G1,
        Self::G2,
        Self::G3,
        Self::Gp0,
        Self::Gp1,
        Self::Gp2,
        Self::Gp3,
        Self::BndG0,
        Self::BndG1,
        Self::BndG2,
        Self::BndG3,
    ];

    pub fn domain(self) -> Domain {
        match self {
            Self::BndG0 | Self::BndG1 | Self::BndG2 | Self::BndG3 => Domain::Boundary,
            _ => Domain::Volume,
        }
    }

    /// Position of the term among `G0..G3` (0 to 3).
    pub fn term(self) -> usize {
        match self {
            Self::G0 | Self::Gp0 | Self::BndG0 => 0,
            Self::G1 | Self::Gp1 | Self::BndG1 => 1,
            Self::G2 | Self::Gp2 | Self::BndG2 => 2,
            Self::G3 | Self::Gp3 | Self::BndG3 => 3,
        }
    }
}

/// Which matrix a Jacobian assembly targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JacobianSet {
    Jacobian,
    Preconditioner,
}

impl JacobianSet {
    /// The four kinds assembled over `domain` for this matrix.
    pub fn kinds(self, domain: Domain) -> [JacobianKind; 4] {
        use JacobianKind::*;
        match (self, domain) {
            (_, Domain::Boundary) => [BndG0, BndG1, BndG2, BndG3],
            (JacobianSet::Jacobian, Domain::Volume) => [G0, G1, G2, G3],
            (JacobianSet::Preconditioner, Domain::Volume) => [Gp0, Gp1, Gp2, Gp3],
        }
    }
}

/// Volume or boundary integration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    Volume,
    Boundary,
}

/// Registry key. Ordering is lexicographic over `(label, value, field, part)`.
///
/// Jacobian keys store the combined index `f * n_fields + g` in `field`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormKey {
    /// Region label; `None` selects the whole mesh (or all boundary facets).
    pub label: Option<String>,
    pub value: i32,
    pub field: usize,
    pub part: i32,
}

impl FormKey {
    pub fn new(label: Option<&str>, value: i32, field: usize, part: i32) -> Self {
        Self {
            label: label.map(str::to_string),
            value,
            field,
            part,
        }
    }

    pub fn region(&self) -> Region {
        Region {
            label: self.label.clone(),
            value: self.value,
            part: self.part,
        }
    }
}

/// A mesh subset plus equation part, without field information.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region {
    pub label: Option<String>,
    pub value: i32,
    pub part: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ordering_is_lexicographic() {
        let mut keys = vec![
            FormKey::new(Some("b"), 1, 0, 0),
            FormKey::new(Some("a"), 2, 0, 0),
            FormKey::new(Some("a"), 1, 1, 0),
            FormKey::new(Some("a"), 1, 0, 1),
            FormKey::new(None, 5, 9, 9),
        ];
        keys.sort();
        let short: Vec<_> = keys
            .iter()
            .map(|k| (k.label.as_deref(), k.value, k.field, k.part))
            .collect();
        assert_eq!(
            short,
            vec![
                (None, 5, 9, 9),
                (Some("a"), 1, 0, 1),
                (Some("a"), 1, 1, 0),
                (Some("a"), 2, 0, 0),
                (Some("b"), 1, 0, 0),
            ]
        );
    }

    #[test]
    fn jacobian_sets() {
        assert_eq!(JacobianSet::Preconditioner.kinds(Domain::Volume)[2], JacobianKind::Gp2);
        assert_eq!(JacobianSet::Jacobian.kinds(Domain::Boundary)[3], JacobianKind::BndG3);
        assert_eq!(JacobianKind::Gp3.term(), 3);
        assert_eq!(ResidualKind::BndF1.domain(), Domain::Boundary);
    }
}
