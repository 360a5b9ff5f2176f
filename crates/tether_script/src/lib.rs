//! Tether Scripting Bridge
//!
//! JavaScript execution via QuickJS, bridged to the ECS.
//!
//! ## Architecture
//!
//! - **Dynamic values:** [`Table`] and [`Value`] mirror script objects in native memory.
//! - **Type adapters:** [`TypeMap`] moves one native type across the boundary,
//!   always working on the top of a [`Stack`].
//! - **Runtime:** [`ScriptRuntime`] owns one interpreter, loads a script, hosts
//!   native [`Library`] namespaces and calls script functions.
//! - **Marshaling:** [`component_kinds!`] declares the closed set of script
//!   visible components; [`Marshaler`] converts their bytes to and from tables.
//!
//! Failures at the boundary come back as [`ScriptError`]. Broken native
//! contracts (reading a missing table key, `construct` without `check`) panic.

pub mod component_library;
pub mod error;
pub mod ffi;
pub mod library;
pub mod marshal;
pub mod math;
pub mod native;
pub mod pack;
pub mod runtime;
pub mod stack;
pub mod store;
pub mod table;
pub mod type_map;
pub mod value;

pub use component_library::component_library;
pub use error::{ErrorKind, ScriptError};
pub use ffi::{EntityHandle, Handle};
pub use library::Library;
pub use marshal::{ComponentKinds, KindDescriptor, Marshaler, ScriptComponent};
pub use native::NativeFunction;
pub use pack::{ArgPack, ReturnPack};
pub use runtime::ScriptRuntime;
pub use stack::Stack;
pub use store::{ComponentStore, WorldRegistry};
pub use table::Table;
pub use type_map::{TypeMap, MAX_TABLE_DEPTH};
pub use value::{FromValue, Kind, Value};

pub use rquickjs;
