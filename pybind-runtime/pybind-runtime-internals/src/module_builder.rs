//! The module and class builders: the fluent surface that turns trampolines
//! and heap types into populated runtime modules.

use pyo3_ffi as ffi;

use crate::class_registry::{self, HeapType};
use crate::error::{raise_runtime_error, Error, ErrorException};
use crate::handle::steal;
use crate::object::module::Module;
use crate::object::Object;
use crate::trampoline::{self, HostFn, HostInit, HostMethod, HostProperty};

/// Create a new native-backed module. The module-definition record is
/// leaked to give it the static lifetime the runtime's `PyModule_Create`
/// requires.
pub fn module_(name: &str) -> Result<ModuleBuilder, Error> {
    let name_c = std::ffi::CString::new(name).unwrap_or_default();
    let name_static: &'static std::ffi::CStr = Box::leak(name_c.into_boxed_c_str());
    let def = Box::leak(Box::new(ffi::PyModuleDef {
        m_base: ffi::PyModuleDef_HEAD_INIT,
        m_name: name_static.as_ptr(),
        m_doc: std::ptr::null(),
        m_size: -1,
        m_methods: std::ptr::null_mut(),
        m_slots: std::ptr::null_mut(),
        m_traverse: None,
        m_clear: None,
        m_free: None,
    }));
    let p = unsafe { ffi::PyModule_Create(def) };
    if p.is_null() {
        return Err(raise_runtime_error(ErrorException::capture().to_string()));
    }
    Ok(ModuleBuilder(Module::from_handle(steal(p))))
}

/// A module under construction. Thin wrapper over [`Module`] adding the
/// `def`/`class` registration surface; the finished [`Module`] is recovered
/// via [`ModuleBuilder::build`].
pub struct ModuleBuilder(Module);

impl ModuleBuilder {
    pub fn add(&self, name: &str, obj: &Object) -> Result<(), Error> {
        self.0.add(name, obj)
    }

    /// Define a new function in the module from a [`HostFn`] body.
    pub fn def<F: HostFn>(&self, name: &'static str) -> Result<(), Error> {
        let def = trampoline::function_def::<F>(name);
        let p = unsafe {
            ffi::PyCFunction_NewEx(
                def as *const ffi::PyMethodDef as *mut ffi::PyMethodDef,
                std::ptr::null_mut(),
                self.0.as_object().as_ptr(),
            )
        };
        if p.is_null() {
            return Err(raise_runtime_error(ErrorException::capture().to_string()));
        }
        let func = Object::from_handle(steal(p));
        self.add(name, &func)
    }

    /// Begin building a heap-type class `T` in this module. Installs the
    /// default no-init `__init__` immediately, so that a class with no
    /// `def_init` call still raises a sensible error on construction
    /// attempts.
    pub fn class<T: 'static>(
        &self,
        name: &'static str,
        destructor: unsafe extern "C" fn(*mut ffi::PyObject),
        parent_getter: Option<fn(&T) -> Object>,
    ) -> Result<ClassBuilder<T>, Error> {
        let heap_type = class_registry::bind::<T>(name, &self.0, destructor, parent_getter)?;
        let builder = ClassBuilder {
            heap_type,
            module: self.0.clone(),
        };
        builder.install_no_init()?;
        self.add(name, &builder.heap_type.as_object())?;
        Ok(builder)
    }

    /// Recover the finished module object, e.g. to `.release()` as the
    /// `init_<modname>` entry point's return value.
    pub fn build(self) -> Module {
        self.0
    }
}

/// A heap-type class under construction; offers `def_init`/`def`/`prop` over
/// a [`HeapType<T>`] bound through the class registry.
pub struct ClassBuilder<T: 'static> {
    heap_type: HeapType<T>,
    module: Module,
}

impl<T: 'static> ClassBuilder<T> {
    fn install_descriptor(&self, name: &str, descriptor: Object) -> Result<(), Error> {
        self.heap_type.as_object().set_attr(name, &descriptor)
    }

    fn install_no_init(&self) -> Result<(), Error> {
        let def = trampoline::no_init_def::<T>();
        let descr = unsafe { ffi::PyDescr_NewMethod(self.heap_type.type_ptr(), def as *const ffi::PyMethodDef as *mut ffi::PyMethodDef) };
        if descr.is_null() {
            return Err(raise_runtime_error(ErrorException::capture().to_string()));
        }
        self.install_descriptor("__init__", Object::from_handle(steal(descr)))
    }

    /// Define a constructing `__init__`, overriding the default no-init.
    pub fn def_init<I: HostInit<T>>(&self) -> Result<(), Error> {
        let def = trampoline::init_def::<T, I>();
        let descr = unsafe { ffi::PyDescr_NewMethod(self.heap_type.type_ptr(), def as *const ffi::PyMethodDef as *mut ffi::PyMethodDef) };
        if descr.is_null() {
            return Err(raise_runtime_error(ErrorException::capture().to_string()));
        }
        self.install_descriptor("__init__", Object::from_handle(steal(descr)))
    }

    /// Define a new method from a [`HostMethod`] body.
    pub fn def<M: HostMethod<T>>(&self, name: &'static str) -> Result<(), Error> {
        let def = trampoline::method_def::<T, M>(name);
        let descr = unsafe { ffi::PyDescr_NewMethod(self.heap_type.type_ptr(), def as *const ffi::PyMethodDef as *mut ffi::PyMethodDef) };
        if descr.is_null() {
            return Err(raise_runtime_error(ErrorException::capture().to_string()));
        }
        self.install_descriptor(name, Object::from_handle(steal(descr)))
    }

    /// Define a new property from a [`HostProperty`] body. `has_setter`
    /// selects whether assignment is permitted; leaving it `false` yields a
    /// read-only property that raises on assignment.
    pub fn prop<P: HostProperty<T>>(&self, name: &'static str, has_setter: bool) -> Result<(), Error> {
        let def = trampoline::getset_def::<T, P>(name, has_setter);
        let descr = unsafe { ffi::PyDescr_NewGetSet(self.heap_type.type_ptr(), def as *const ffi::PyGetSetDef as *mut ffi::PyGetSetDef) };
        if descr.is_null() {
            return Err(raise_runtime_error(ErrorException::capture().to_string()));
        }
        self.install_descriptor(name, Object::from_handle(steal(descr)))
    }

    /// The bound heap type, e.g. to `.create(value)` new instances from host
    /// code.
    pub fn heap_type(&self) -> &HeapType<T> {
        &self.heap_type
    }

    pub fn module(&self) -> &Module {
        &self.module
    }
}

/// Convenience alias used by the `#[host_class]` expansion (see
/// `pybind-runtime-macros`) to name a class's destructor trampoline without
/// repeating the turbofish at every call site.
pub fn destructor_for<T: 'static>() -> unsafe extern "C" fn(*mut ffi::PyObject) {
    trampoline::destructor_trampoline::<T>
}

#[cfg(test)]
mod tests {
    // Building and populating a module requires a live interpreter; see
    // `pybind-runtime/tests/classes.rs` for coverage of `module_`/`class`/
    // `def_init`/`def`/`prop` together.
}
