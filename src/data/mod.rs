//! DOF layout (atlas, section) and closure access.

pub mod atlas;
pub mod closure;
pub mod section;

pub use atlas::Atlas;
pub use closure::{ClosureAccessor, ClosureMap};
pub use section::{ClosureLayout, FieldDofs, Section, SectionBuilder};
