//! Field catalog: registry of unknown and auxiliary fields of one problem.
//!
//! Fields are identified by a `usize` id that is unique within its kind
//! (primary or auxiliary). `add_*` picks the smallest free id, `set_*`
//! registers under an explicit id and rejects collisions.

use std::collections::BTreeMap;

use crate::mesh_error::MeshFormsError;

/// Description of one field.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldInfo {
    pub id: usize,
    pub name: String,
    /// Number of components.
    pub nc: usize,
    /// Polynomial order (0 = cellwise constant, 1 = vertex-based linear).
    pub order: usize,
    /// Label restricting the field to a region; `None` means the whole mesh.
    pub region: Option<String>,
    pub component_names: Vec<String>,
}

impl FieldInfo {
    fn new(id: usize, name: &str, nc: usize, order: usize, region: Option<&str>) -> Self {
        let component_names = if nc == 1 {
            Vec::new()
        } else {
            (0..nc).map(|c| c.to_string()).collect()
        };
        Self {
            id,
            name: name.to_string(),
            nc,
            order,
            region: region.map(str::to_string),
            component_names,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct FieldTable {
    fields: BTreeMap<usize, FieldInfo>,
    ids: BTreeMap<String, usize>,
}

impl FieldTable {
    fn next_id(&self) -> usize {
        (0..)
            .find(|id| !self.fields.contains_key(id))
            .unwrap_or(self.fields.len())
    }

    fn insert(&mut self, info: FieldInfo) {
        self.ids.insert(info.name.clone(), info.id);
        self.fields.insert(info.id, info);
    }

    fn component_name(&self, id: usize, c: usize) -> Option<Result<String, MeshFormsError>> {
        let fi = self.fields.get(&id)?;
        Some(if fi.nc == 1 {
            Ok(String::new())
        } else {
            fi.component_names
                .get(c)
                .cloned()
                .ok_or(MeshFormsError::ComponentOutOfRange {
                    component: c,
                    nc: fi.nc,
                })
        })
    }

    fn set_component_name(
        &mut self,
        id: usize,
        c: usize,
        name: &str,
    ) -> Option<Result<(), MeshFormsError>> {
        let fi = self.fields.get_mut(&id)?;
        Some(if fi.nc == 1 {
            log::error!("Unable to set component name for single-component field '{}'", fi.name);
            Err(MeshFormsError::SingleComponentField)
        } else if c >= fi.nc {
            Err(MeshFormsError::ComponentOutOfRange {
                component: c,
                nc: fi.nc,
            })
        } else {
            fi.component_names[c] = name.to_string();
            Ok(())
        })
    }
}

/// Per-problem registry of fields and auxiliary fields.
#[derive(Clone, Debug, Default)]
pub struct FieldCatalog {
    primary: FieldTable,
    aux: FieldTable,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a field under the smallest free id and returns the id.
    pub fn add_field(&mut self, name: &str, nc: usize, order: usize) -> Result<usize, MeshFormsError> {
        let id = self.primary.next_id();
        self.set_field(id, name, nc, order, None)?;
        Ok(id)
    }

    /// Registers a field under an explicit id.
    pub fn set_field(
        &mut self,
        id: usize,
        name: &str,
        nc: usize,
        order: usize,
        region: Option<&str>,
    ) -> Result<(), MeshFormsError> {
        if self.primary.fields.contains_key(&id) {
            log::error!("Cannot add field '{name}' with ID = {id}. ID already exists.");
            return Err(MeshFormsError::DuplicateField {
                id,
                name: name.to_string(),
            });
        }
        if let Some(&other) = self.primary.ids.get(name) {
            log::error!("Cannot add field '{name}' with ID = {id}. Name already used by ID = {other}.");
            return Err(MeshFormsError::DuplicateFieldName(name.to_string()));
        }
        log::debug!("field '{name}' (id {id}, {nc} components, order {order})");
        self.primary.insert(FieldInfo::new(id, name, nc, order, region));
        Ok(())
    }

    /// Registers an auxiliary field under the smallest free id.
    pub fn add_aux_field(
        &mut self,
        name: &str,
        nc: usize,
        order: usize,
        region: Option<&str>,
    ) -> Result<usize, MeshFormsError> {
        let id = self.aux.next_id();
        self.set_aux_field(id, name, nc, order, region)?;
        Ok(id)
    }

    /// Registers an auxiliary field under an explicit id.
    pub fn set_aux_field(
        &mut self,
        id: usize,
        name: &str,
        nc: usize,
        order: usize,
        region: Option<&str>,
    ) -> Result<(), MeshFormsError> {
        if self.aux.fields.contains_key(&id) {
            log::error!("Cannot add auxiliary field '{name}' with ID = {id}. ID is already taken.");
            return Err(MeshFormsError::DuplicateAuxField {
                id,
                name: name.to_string(),
            });
        }
        if let Some(&other) = self.aux.ids.get(name) {
            log::error!("Cannot add auxiliary field '{name}' with ID = {id}. Name already used by ID = {other}.");
            return Err(MeshFormsError::DuplicateAuxFieldName(name.to_string()));
        }
        self.aux.insert(FieldInfo::new(id, name, nc, order, region));
        Ok(())
    }

    pub fn num_fields(&self) -> usize {
        self.primary.fields.len()
    }

    /// Fields in id order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.primary.fields.values()
    }

    pub fn field(&self, id: usize) -> Result<&FieldInfo, MeshFormsError> {
        self.primary
            .fields
            .get(&id)
            .ok_or(MeshFormsError::UnknownField(id))
    }

    /// Field names in id order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields().map(|f| f.name.clone()).collect()
    }

    pub fn field_name(&self, id: usize) -> Result<&str, MeshFormsError> {
        Ok(&self.field(id)?.name)
    }

    pub fn field_id(&self, name: &str) -> Result<usize, MeshFormsError> {
        self.primary
            .ids
            .get(name)
            .copied()
            .ok_or_else(|| MeshFormsError::UnknownFieldName(name.to_string()))
    }

    pub fn has_field_by_id(&self, id: usize) -> bool {
        self.primary.fields.contains_key(&id)
    }

    pub fn has_field_by_name(&self, name: &str) -> bool {
        self.primary.ids.contains_key(name)
    }

    pub fn field_num_components(&self, id: usize) -> Result<usize, MeshFormsError> {
        Ok(self.field(id)?.nc)
    }

    pub fn field_order(&self, id: usize) -> Result<usize, MeshFormsError> {
        Ok(self.field(id)?.order)
    }

    /// Component name; single-component fields have an empty name.
    pub fn field_component_name(&self, id: usize, c: usize) -> Result<String, MeshFormsError> {
        self.primary
            .component_name(id, c)
            .unwrap_or(Err(MeshFormsError::UnknownField(id)))
    }

    pub fn set_field_component_name(
        &mut self,
        id: usize,
        c: usize,
        name: &str,
    ) -> Result<(), MeshFormsError> {
        self.primary
            .set_component_name(id, c, name)
            .unwrap_or(Err(MeshFormsError::UnknownField(id)))
    }

    pub fn num_aux_fields(&self) -> usize {
        self.aux.fields.len()
    }

    /// Auxiliary fields in id order.
    pub fn aux_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.aux.fields.values()
    }

    pub fn aux_field(&self, id: usize) -> Result<&FieldInfo, MeshFormsError> {
        self.aux
            .fields
            .get(&id)
            .ok_or(MeshFormsError::UnknownAuxField(id))
    }

    pub fn aux_field_names(&self) -> Vec<String> {
        self.aux_fields().map(|f| f.name.clone()).collect()
    }

    pub fn aux_field_name(&self, id: usize) -> Result<&str, MeshFormsError> {
        Ok(&self.aux_field(id)?.name)
    }

    pub fn aux_field_id(&self, name: &str) -> Result<usize, MeshFormsError> {
        self.aux
            .ids
            .get(name)
            .copied()
            .ok_or_else(|| MeshFormsError::UnknownAuxFieldName(name.to_string()))
    }

    pub fn has_aux_field_by_id(&self, id: usize) -> bool {
        self.aux.fields.contains_key(&id)
    }

    pub fn has_aux_field_by_name(&self, name: &str) -> bool {
        self.aux.ids.contains_key(name)
    }

    pub fn aux_field_num_components(&self, id: usize) -> Result<usize, MeshFormsError> {
        Ok(self.aux_field(id)?.nc)
    }

    pub fn aux_field_order(&self, id: usize) -> Result<usize, MeshFormsError> {
        Ok(self.aux_field(id)?.order)
    }

    pub fn aux_field_component_name(&self, id: usize, c: usize) -> Result<String, MeshFormsError> {
        self.aux
            .component_name(id, c)
            .unwrap_or(Err(MeshFormsError::UnknownAuxField(id)))
    }

    pub fn set_aux_field_component_name(
        &mut self,
        id: usize,
        c: usize,
        name: &str,
    ) -> Result<(), MeshFormsError> {
        self.aux
            .set_component_name(id, c, name)
            .unwrap_or(Err(MeshFormsError::UnknownAuxField(id)))
    }

    /// Finite-volume view: every field folded into one cellwise field with id 0.
    ///
    /// Components are named after their field (`name`) or, for
    /// multi-component fields, `name_component`.
    pub fn finite_volume_view(&self) -> FieldInfo {
        let component_names: Vec<String> = self
            .fields()
            .flat_map(|fi| {
                (0..fi.nc).map(move |c| match fi.component_names.get(c) {
                    Some(comp) if fi.nc > 1 => format!("{}_{}", fi.name, comp),
                    _ => fi.name.clone(),
                })
            })
            .collect();
        FieldInfo {
            id: 0,
            name: itertools::join(self.fields().map(|f| f.name.as_str()), "+"),
            nc: component_names.len(),
            order: 0,
            region: None,
            component_names,
        }
    }
}
