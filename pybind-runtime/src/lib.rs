//! # pybind-runtime: a statically-typed binding layer for an embedded
//! dynamic scripting runtime
//!
//! This crate embeds a dynamic scripting runtime in the host process and
//! exposes host types and functions to it through thin, typed façades over
//! the runtime's reference-counted object model, rather than working
//! directly against its raw C ABI.
//!
//! The runtime is also extensible: most of the interesting types
//! ([`Object`], [`Convert`], [`HeapType`], the module/class builders) are
//! public in `pybind-runtime-internals` so embedders can build further
//! abstractions on top. See that crate for the implementation.
//!
//! ## Starting an interpreter
//!
//! ```no_run
//! use pybind_runtime::{Config, Interpreter};
//!
//! let interp = Interpreter::new(Config::new())?;
//! interp.exec("print('hello from the embedded runtime')");
//! # Ok::<(), pybind_runtime::Error>(())
//! ```
//!
//! ## Exposing a host function
//!
//! A host function can be written in plain Rust and registered with the
//! [`host_fn`] attribute, which binds its parameters against the caller's
//! positional/keyword arguments by name:
//!
//! ```ignore
//! use pybind_runtime::{host_fn, module_};
//!
//! #[host_fn]
//! fn add(a: i64, b: i64) -> i64 {
//!     a + b
//! }
//!
//! let module = module_("arith")?;
//! module.def::<add_host>("add")?;
//! let module = module.build();
//! ```
//!
//! ## Exposing a host class
//!
//! ```ignore
//! use pybind_runtime::{host_class, module_, destructor_for};
//!
//! struct Point { x: f64, y: f64 }
//!
//! #[host_class]
//! impl Point {
//!     #[host_init]
//!     fn new(x: f64, y: f64) -> Self {
//!         Point { x, y }
//!     }
//!
//!     #[host_method]
//!     fn norm(&self) -> f64 {
//!         (self.x * self.x + self.y * self.y).sqrt()
//!     }
//! }
//!
//! let module = module_("geometry")?;
//! let point_class = module.class::<Point>("Point", destructor_for::<Point>(), None)?;
//! point_class.def_init::<new_init>()?;
//! point_class.def::<norm_method>("norm")?;
//! let module = module.build();
//! ```

#![deny(bare_trait_objects)]

pub use pybind_runtime_internals as internals;
pub use pybind_runtime_macros::{host_class, host_fn};

pub use pybind_runtime_internals::call::{kwarg, CallArgument, IntoCallArgument, Kwarg};
pub use pybind_runtime_internals::class_registry::HeapType;
pub use pybind_runtime_internals::convert::Convert;
pub use pybind_runtime_internals::error::{
    raise_assertion_error, raise_runtime_error, raise_system_error, raise_type_error,
    raise_value_error, Error, ErrorException,
};
pub use pybind_runtime_internals::gil::{acquire, release, AcquireScope, ReleaseScope};
pub use pybind_runtime_internals::handle::{borrow, steal, Handle};
pub use pybind_runtime_internals::interpreter::{Config, Interpreter};
pub use pybind_runtime_internals::memory::{make_memory, MemoryView};
pub use pybind_runtime_internals::module_builder::{destructor_for, module_, ClassBuilder, ModuleBuilder};
pub use pybind_runtime_internals::object::capsule::Capsule;
pub use pybind_runtime_internals::object::Object;
pub use pybind_runtime_internals::params::Param;
pub use pybind_runtime_internals::trampoline::{HostFn, HostInit, HostMethod, HostProperty};
pub use pybind_runtime_internals::typing::{type_name, Any, Facade, Optional};

pub mod object {
    //! Concrete façade types ("capability tags" wrapping a handle with a
    //! compile-time type witness) and the protocol traits they implement.
    pub use pybind_runtime_internals::object::exception::{BaseException, Traceback};
    pub use pybind_runtime_internals::object::iterator::Iterator;
    pub use pybind_runtime_internals::object::mapping::{Dict, Mapping};
    #[cfg(feature = "numpy")]
    pub use pybind_runtime_internals::object::ndarray::NDArray;
    pub use pybind_runtime_internals::object::module::{import, Module};
    pub use pybind_runtime_internals::object::number::{Bool, Float, Int};
    pub use pybind_runtime_internals::object::sequence::{List, Sequence, Tuple};
    pub use pybind_runtime_internals::object::set::Set;
    pub use pybind_runtime_internals::object::string::Str;
    pub use pybind_runtime_internals::object::typeobj::Type;
}
