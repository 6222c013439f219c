//! Section: the DOF-layout descriptor.
//!
//! A `Section` assigns every mesh point a contiguous block of degrees of
//! freedom (through an [`Atlas`]) and records how that block splits between
//! fields. It also carries the closure ordering flag and the set of DOFs
//! constrained by essential boundary conditions.

use std::collections::{BTreeMap, BTreeSet};

use crate::data::atlas::Atlas;
use crate::discretization::fields::FieldInfo;
use crate::mesh::Mesh;
use crate::mesh_error::MeshFormsError;
use crate::topology::point::PointId;

/// Ordering of DOFs inside a closure buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClosureLayout {
    /// All DOFs of the first field over the closure, then the next field.
    #[default]
    FieldMajor,
    /// All DOFs of the first closure point, then the next point.
    PointMajor,
}

/// DOFs of one field at one point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldDofs {
    pub field: usize,
    /// Offset relative to the start of the point's block.
    pub offset: usize,
    pub len: usize,
}

/// Collects `(point, field, count)` triples and lays them out.
#[derive(Clone, Debug, Default)]
pub struct SectionBuilder {
    entries: BTreeMap<PointId, BTreeMap<usize, usize>>,
}

impl SectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` DOFs of `field` on `p`. Repeated calls accumulate.
    pub fn add_dofs(&mut self, p: PointId, field: usize, count: usize) -> &mut Self {
        if count > 0 {
            *self.entries.entry(p).or_default().entry(field).or_default() += count;
        }
        self
    }

    /// Points ordered by id, fields ordered by id inside a point.
    pub fn build(&self, layout: ClosureLayout) -> Result<Section, MeshFormsError> {
        let mut atlas = Atlas::default();
        let mut dofs = BTreeMap::new();
        let mut fields = BTreeSet::new();
        for (&p, per_field) in &self.entries {
            let mut offset = 0;
            let mut blocks = Vec::with_capacity(per_field.len());
            for (&field, &len) in per_field {
                blocks.push(FieldDofs { field, offset, len });
                fields.insert(field);
                offset += len;
            }
            atlas.try_insert(p, offset)?;
            dofs.insert(p, blocks);
        }
        let section = Section {
            atlas,
            dofs,
            fields: fields.into_iter().collect(),
            layout,
            constrained: BTreeMap::new(),
        };
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        section.validate_invariants()?;
        log::debug!(
            "section: {} points, {} dofs, {:?}",
            section.atlas.len(),
            section.len(),
            layout
        );
        Ok(section)
    }
}

/// DOF layout of a discrete function space.
#[derive(Clone, Debug, Default)]
pub struct Section {
    atlas: Atlas,
    dofs: BTreeMap<PointId, Vec<FieldDofs>>,
    fields: Vec<usize>,
    layout: ClosureLayout,
    constrained: BTreeMap<PointId, BTreeSet<usize>>,
}

impl Section {
    /// Lays out `fields` on `mesh`.
    ///
    /// Order-1 fields put `nc` DOFs on every vertex of their region, order-0
    /// fields put `nc` DOFs on every cell of their region. A region is the
    /// stratum of its label with value 1.
    pub fn from_fields<'a>(
        mesh: &Mesh,
        fields: impl IntoIterator<Item = &'a FieldInfo>,
        layout: ClosureLayout,
    ) -> Result<Self, MeshFormsError> {
        let mut builder = SectionBuilder::new();
        for fi in fields {
            if let Some(region) = fi.region.as_deref() {
                if !mesh.has_label(region) {
                    log::error!("Field '{}' is restricted to unknown region '{region}'", fi.name);
                    return Err(MeshFormsError::UnknownLabel(region.to_string()));
                }
            }
            let points = match fi.order {
                0 => mesh.region_cells(fi.region.as_deref(), 1),
                1 => mesh.region_vertices(fi.region.as_deref(), 1),
                k => {
                    return Err(MeshFormsError::Unsupported(format!(
                        "field '{}' of order {k}",
                        fi.name
                    )));
                }
            };
            for p in points {
                builder.add_dofs(p, fi.id, fi.nc);
            }
        }
        builder.build(layout)
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn layout(&self) -> ClosureLayout {
        self.layout
    }

    /// Total number of DOFs.
    pub fn len(&self) -> usize {
        self.atlas.total_len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlas.total_len() == 0
    }

    /// Field ids present in the section, ascending.
    pub fn field_ids(&self) -> &[usize] {
        &self.fields
    }

    pub fn contains(&self, p: PointId) -> bool {
        self.atlas.contains(p)
    }

    /// Points carrying DOFs, ascending.
    pub fn points(&self) -> impl Iterator<Item = PointId> + '_ {
        self.dofs.keys().copied()
    }

    /// `(offset, len)` of the whole block of `p`.
    pub fn offset(&self, p: PointId) -> Result<(usize, usize), MeshFormsError> {
        self.atlas
            .get(p)
            .ok_or(MeshFormsError::MissingSectionPoint(p))
    }

    /// Per-field blocks of `p`; empty when `p` carries no DOFs.
    pub fn field_dofs(&self, p: PointId) -> &[FieldDofs] {
        self.dofs.get(&p).map_or(&[], Vec::as_slice)
    }

    /// Global `(offset, len)` of `field` on `p`.
    pub fn field_offset(&self, p: PointId, field: usize) -> Option<(usize, usize)> {
        let (base, _) = self.atlas.get(p)?;
        self.field_dofs(p)
            .iter()
            .find(|fd| fd.field == field)
            .map(|fd| (base + fd.offset, fd.len))
    }

    /// Marks components of `field` on `p` as constrained.
    pub fn constrain(
        &mut self,
        p: PointId,
        field: usize,
        components: &[usize],
    ) -> Result<(), MeshFormsError> {
        let fd = self
            .field_dofs(p)
            .iter()
            .find(|fd| fd.field == field)
            .copied()
            .ok_or(MeshFormsError::MissingSectionPoint(p))?;
        let set = self.constrained.entry(p).or_default();
        for &c in components {
            if c >= fd.len {
                return Err(MeshFormsError::ComponentOutOfRange {
                    component: c,
                    nc: fd.len,
                });
            }
            set.insert(fd.offset + c);
        }
        Ok(())
    }

    /// Global indices of all constrained DOFs, ascending.
    pub fn constrained_indices(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .constrained
            .iter()
            .filter_map(|(p, locals)| {
                self.atlas
                    .get(*p)
                    .map(|(base, _)| locals.iter().map(move |l| base + l))
            })
            .flatten()
            .collect();
        out.sort_unstable();
        out
    }

    /// Removes every constraint.
    pub fn clear_constraints(&mut self) {
        self.constrained.clear();
    }

    /// Checks that per-field blocks tile each point's atlas slice.
    pub fn validate_invariants(&self) -> Result<(), MeshFormsError> {
        self.atlas.validate_invariants()?;
        for (p, blocks) in &self.dofs {
            let (_, len) = self.offset(*p)?;
            let mut expected = 0;
            for fd in blocks {
                if fd.offset != expected {
                    return Err(MeshFormsError::InvalidGeometry(format!(
                        "field {} on {p} starts at {}, expected {expected}",
                        fd.field, fd.offset
                    )));
                }
                expected += fd.len;
            }
            if expected != len {
                return Err(MeshFormsError::InvalidGeometry(format!(
                    "fields on {p} cover {expected} of {len} dofs"
                )));
            }
        }
        Ok(())
    }
}
