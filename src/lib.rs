//! # tessella-model
//!
//! In-memory semantic model for Tessella schema libraries: libraries own
//! members (business objects, simple types, enumerations, contextual
//! facets), business objects expose facets, and alias lists on facets are
//! derived from the business object's aliases through synchronizers.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌───────────────────────────┐
//!                    │           Model           │
//!                    │  arena · registry · bus   │
//!                    └─────────────┬─────────────┘
//!          ┌───────────────┬──────┴───────┬────────────────┐
//!          │               │              │                │
//!   ┌──────┴─────┐  ┌──────┴──────┐  ┌────┴─────┐  ┌───────┴────────┐
//!   │ EntityArena│  │  ChildList  │  │ EventBus │  │ VersionScheme  │
//!   │ (gen keys) │  │ ops+cascade │  │ +guards  │  │   registry     │
//!   └────────────┘  └──────┬──────┘  └──────────┘  └────────────────┘
//!                          │
//!                   ┌──────┴───────┐
//!                   │ Synchronizer │  source list ──> derived list
//!                   └──────────────┘  (aliases ──> facet aliases ──> list views)
//! ```
//!
//! Every mutation follows one contract: ownership and list state change
//! first, the event fires second, synchronizers cascade third. Cascades go
//! through the same list operations, so each derived hop is itself
//! observable. [`ReferenceGraph`] gives petgraph-backed queries over type
//! references, built on demand as a snapshot.
//!
//! ## Example
//!
//! ```
//! use tessella_model::{FacetKind, Model};
//!
//! let mut model = Model::new();
//! let lib = model.create_library("Shipping", "http://example.org/shipping/v1");
//! model.add_library(lib)?;
//!
//! let order = model.create_business_object("Order")?;
//! model.add_member(lib, order)?;
//! model.add_alias(order, "PurchaseOrder")?;
//!
//! let summary = model.facet_of(order, FacetKind::Summary)?;
//! let derived = model.aliases(summary)?;
//! assert_eq!(model.alias(derived[0])?.name(), "PurchaseOrder_Summary");
//! # Ok::<(), tessella_model::ModelError>(())
//! ```

pub mod arena;
pub mod children;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod model;
pub mod refgraph;
pub mod sync;
pub mod version;

pub use arena::EntityKey;
pub use children::{ChildList, ListRef, ListRole};
pub use config::{BuiltinLibraryDef, ModelConfig};
pub use entity::{
    Alias, Attribute, BusinessObject, Element, EntityData, EntityKind, EnumValue, Enumeration,
    Facet, FacetKind, Library, LibraryKind, MemberKind, NamespaceImport, SimpleType,
};
pub use error::{ModelError, Result};
pub use event::{Event, EventBus, EventGuard, EventKind, ModelListener, Subject};
pub use model::Model;
pub use refgraph::{ClosureEntry, Direction, RefKind, ReferenceGraph, SearchResult};
pub use sync::{DeriveRule, Synchronizer};
pub use version::{DecimalDotScheme, VersionScheme, VersionSchemeRegistry, DECIMAL_DOT};
