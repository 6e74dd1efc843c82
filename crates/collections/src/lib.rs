//! Instrumented collections for owner-tracked attributes.
//!
//! A collection attribute holds a container (list-, set-, dict-shaped, or a custom type with
//! annotated methods). Every membership change made through the [`Collection`] handle is reported
//! to the attribute's listener chain before it is applied, so an owning change tracker always sees
//! the same membership the container holds.
//!
//! # Mental Model
//!
//! 1. **Declaration:** a container type describes itself through [`Container::descriptor`]:
//!    structural shape traits ([`ListOps`], [`SetOps`], [`DictOps`]) plus optional method
//!    annotations.
//! 2. **Classification:** [`classify`] turns the descriptor into a [`RoleTable`], resolved once per
//!    type and cached by the process-wide [`RoleRegistry`].
//! 3. **Binding:** a [`CollectionAttribute`] creates containers for an [`Instance`] and binds each
//!    one to a [`CollectionAdapter`], the owner's view of that container.
//! 4. **Mutation:** the [`ListProxy`], [`SetProxy`] and [`DictProxy`] surfaces (and
//!    [`Collection::call`] for custom methods) fire `append`/`remove`/`set` events around the native
//!    operation.
//! 5. **Replacement:** assigning a whole new value through [`CollectionAttribute::set`] reconciles
//!    the old and new membership into the minimal event sequence and severs the old container.
//!
//! # Concurrency
//!
//! - One container is mutated from one thread at a time; events dispatch synchronously.
//! - The role registry and listener chains are read lock-free and published by CAS.

pub mod adapter;
pub mod attribute;
pub mod builtin;
pub mod bulk;
pub mod capability;
pub mod classify;
pub mod collection;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod instance;
pub mod keyed;
pub mod member;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use adapter::CollectionAdapter;
pub use attribute::{CollectionAttribute, ContainerFactory};
pub use bulk::{BulkDiff, BulkValue, DiffInput, Placement};
pub use capability::{Role, RoleSet, Shape, StructuralCaps};
pub use classify::{RoleTable, classify};
pub use collection::{
	Collection, DictProxy, Emit, ListProxy, SetOperand, SetProxy, Slice, collection_adapter,
};
pub use descriptor::{
	Arg, ArgPosition, Container, DictKey, DictOps, ListOps, MemberOf, MethodAnnotation, MethodCall,
	MethodOp, Mutator, SetOps, TypeDescriptor,
};
pub use error::{CollectionError, ConfigurationError, ListenerError, Result};
pub use event::{CollectionListener, EventFlow, EventKind, Initiator, Listeners};
pub use instance::{Instance, InstanceId};
pub use keyed::{
	Column, ColumnSpec, KeyFuncMap, KeyLookup, KeySpec, UnpopulatedPolicy, keyed_by,
	keyed_by_attribute, keyed_by_derived_column,
};
pub use member::{AttributeSource, KeyValue, Member};
pub use registry::{RoleRegistry, roles_for};

/// Proxy traits needed to mutate collection handles.
pub mod prelude {
	pub use crate::collection::{DictProxy, ListProxy, SetProxy};
}
