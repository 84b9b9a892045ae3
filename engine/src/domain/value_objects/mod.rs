pub mod admin_state;
pub mod component_kind;
pub mod property;

pub use admin_state::AdminState;
pub use component_kind::{CodeKind, ComponentKind, ComponentType};
pub use property::{PropertyDef, PropertyKind, PropertyMode, PropertyValue};
