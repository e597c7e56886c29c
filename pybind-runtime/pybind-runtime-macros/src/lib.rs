extern crate proc_macro;

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{FnArg, ImplItem, ItemFn, ItemImpl, Pat, ReturnType, Signature, Type};

/// Crate path to the internals crate, switched depending on whether this
/// attribute is used from inside `pybind-runtime-internals` itself (its own
/// tests) or from a downstream crate depending on the `pybind-runtime`
/// facade, resolved via a `CARGO_PKG_NAME` check at macro-expansion time.
fn internals_path() -> proc_macro2::TokenStream {
    let in_internals = std::env::var("CARGO_PKG_NAME").as_deref() == Ok("pybind-runtime-internals");
    if in_internals {
        quote! { crate }
    } else {
        quote! { pybind_runtime::internals }
    }
}

/// Bind a parameter list of arity 0-6 against `posargs`/`kwargs`, producing
/// the bound host values as a tuple-destructuring `let`, via the
/// `bind0`..`bind6` family.
fn bind_params(
    internals: &proc_macro2::TokenStream,
    func_label: &str,
    params: &[(syn::Ident, Type)],
) -> proc_macro2::TokenStream {
    let n = params.len();
    if n == 0 {
        return quote! {
            #internals::params::bind0(#func_label, posargs, kwargs)?;
        };
    }
    let bind_fn = format_ident!("bind{}", n);
    let idents: Vec<_> = params.iter().map(|(i, _)| i.clone()).collect();
    let tys: Vec<_> = params.iter().map(|(_, t)| t.clone()).collect();
    let names: Vec<_> = idents.iter().map(|i| i.to_string()).collect();
    quote! {
        let ( #(#idents,)* ) = #internals::params::#bind_fn(
            #func_label,
            ( #( &#internals::params::Param::<#tys>::new(#names) ),* ,),
            posargs,
            kwargs,
        )?;
    }
}

/// Pull `(name, type)` pairs for every non-receiver parameter of `sig`,
/// rejecting patterns this attribute can't name (only simple identifier
/// parameters are supported, matching the binder's by-name contract).
fn plain_params(sig: &Signature) -> syn::Result<Vec<(syn::Ident, Type)>> {
    sig.inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Receiver(_) => None,
            FnArg::Typed(pat_ty) => Some(pat_ty),
        })
        .map(|pat_ty| match &*pat_ty.pat {
            Pat::Ident(pat_ident) => Ok((pat_ident.ident.clone(), (*pat_ty.ty).clone())),
            other => Err(syn::Error::new(
                other.span(),
                "host-bound parameters must be simple identifiers",
            )),
        })
        .collect()
}

/// Wrap a call's return value as `Result<Option<Object>, Error>`: `()`
/// becomes `None`, anything else is wrapped via `Object::new`.
fn wrap_result(internals: &proc_macro2::TokenStream, ret: &ReturnType, expr: proc_macro2::TokenStream) -> proc_macro2::TokenStream {
    match ret {
        ReturnType::Default => quote! { #expr; Ok(None) },
        ReturnType::Type(_, ty) if matches!(&**ty, Type::Tuple(t) if t.elems.is_empty()) => {
            quote! { #expr; Ok(None) }
        }
        ReturnType::Type(..) => {
            quote! { Ok(Some(#internals::object::Object::new(&(#expr)))) }
        }
    }
}

/// Turn a free host function into a [`HostFn`](../pybind_runtime_internals/trampoline/trait.HostFn.html)
/// body, binding its parameters by name via the positional/keyword binder and wrapping its
/// return value as the call protocol expects.
///
/// ```ignore
/// #[host_fn]
/// fn add(a: i64, b: i64) -> i64 {
///     a + b
/// }
///
/// module.def::<add_host>("add")?;
/// ```
///
/// The original function is left callable directly; this attribute only
/// adds a marker type (`<name>_host`) implementing `HostFn` alongside it.
#[proc_macro_attribute]
pub fn host_fn(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let func = syn::parse_macro_input!(item as ItemFn);
    let internals = internals_path();
    let params = match plain_params(&func.sig) {
        Ok(p) => p,
        Err(e) => return e.to_compile_error().into(),
    };
    let ident = func.sig.ident.clone();
    let host_ident = format_ident!("{}_host", ident);
    let func_label = format!("function '{}'", ident);
    let arg_names: Vec<_> = params.iter().map(|(i, _)| i.clone()).collect();
    let bind = bind_params(&internals, &func_label, &params);
    let call_expr = quote! { #ident( #(#arg_names),* ) };
    let wrapped = wrap_result(&internals, &func.sig.output, call_expr);

    let expanded = quote! {
        #func

        /// Marker type carrying `#ident`'s body through the closure-free
        /// trampoline ABI.
        #[allow(non_camel_case_types)]
        pub struct #host_ident;

        impl #internals::trampoline::HostFn for #host_ident {
            fn call(
                posargs: &[#internals::object::Object],
                kwargs: Option<&#internals::object::mapping::Dict>,
            ) -> Result<Option<#internals::object::Object>, #internals::error::Error> {
                #bind
                #wrapped
            }
        }
    };
    expanded.into()
}

/// Turn an `impl Type { ... }` block's tagged methods into the marker types
/// `#[host_class]`'s callers register with a [`ClassBuilder`], collecting a
/// batch of members into one registration pass.
///
/// Recognized per-method attributes (consumed, not left on the output):
/// - `#[host_init]` — binds `HostInit<Self>`; the method must return `Self`.
/// - `#[host_method]` — binds `HostMethod<Self>`; the method must take `&self`.
/// - `#[host_getter]` — binds `HostProperty<Self>::get`; no setter.
///
/// ```ignore
/// #[host_class]
/// impl Point {
///     #[host_init]
///     fn new(x: f64, y: f64) -> Self { Point { x, y } }
///
///     #[host_method]
///     fn norm(&self) -> f64 { (self.x * self.x + self.y * self.y).sqrt() }
/// }
/// ```
#[proc_macro_attribute]
pub fn host_class(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let imp = syn::parse_macro_input!(item as ItemImpl);
    let internals = internals_path();
    let self_ty = (*imp.self_ty).clone();

    let mut plain_items = Vec::new();
    let mut markers = Vec::new();

    for item in &imp.items {
        let ImplItem::Fn(method) = item else {
            plain_items.push(item.clone());
            continue;
        };
        let mut method = method.clone();
        let kind = method.attrs.iter().find_map(|a| {
            if a.path().is_ident("host_init") {
                Some("init")
            } else if a.path().is_ident("host_method") {
                Some("method")
            } else if a.path().is_ident("host_getter") {
                Some("getter")
            } else {
                None
            }
        });
        method.attrs.retain(|a| {
            !(a.path().is_ident("host_init")
                || a.path().is_ident("host_method")
                || a.path().is_ident("host_getter"))
        });

        let Some(kind) = kind else {
            plain_items.push(ImplItem::Fn(method));
            continue;
        };

        let ident = method.sig.ident.clone();
        let has_receiver = matches!(method.sig.inputs.first(), Some(FnArg::Receiver(_)));
        let params = match plain_params(&method.sig) {
            Ok(p) => p,
            Err(e) => return e.to_compile_error().into(),
        };
        let arg_names: Vec<_> = params.iter().map(|(i, _)| i.clone()).collect();

        // The trampoline boundary prefixes binder errors with
        // `function '<name>': `, `method '<name>': `, or `__init__`
        // depending on which kind of callable is being bound.
        let func_label = match kind {
            "init" => "__init__".to_string(),
            "method" => format!("method '{}'", ident),
            _ => ident.to_string(),
        };
        let bind = bind_params(&internals, &func_label, &params);

        let marker = match kind {
            "init" => {
                let host_ident = format_ident!("{}_init", ident);
                let call_expr = quote! { #self_ty::#ident( #(#arg_names),* ) };
                quote! {
                    #[allow(non_camel_case_types)]
                    pub struct #host_ident;
                    impl #internals::trampoline::HostInit<#self_ty> for #host_ident {
                        fn call(
                            posargs: &[#internals::object::Object],
                            kwargs: Option<&#internals::object::mapping::Dict>,
                        ) -> Result<#self_ty, #internals::error::Error> {
                            #bind
                            Ok(#call_expr)
                        }
                    }
                }
            }
            "method" => {
                if !has_receiver {
                    return syn::Error::new(method.sig.span(), "#[host_method] requires &self")
                        .to_compile_error()
                        .into();
                }
                let host_ident = format_ident!("{}_method", ident);
                let call_expr = quote! { instance.#ident( #(#arg_names),* ) };
                let wrapped = wrap_result(&internals, &method.sig.output, call_expr);
                quote! {
                    #[allow(non_camel_case_types)]
                    pub struct #host_ident;
                    impl #internals::trampoline::HostMethod<#self_ty> for #host_ident {
                        fn call(
                            instance: &#self_ty,
                            posargs: &[#internals::object::Object],
                            kwargs: Option<&#internals::object::mapping::Dict>,
                        ) -> Result<Option<#internals::object::Object>, #internals::error::Error> {
                            #bind
                            #wrapped
                        }
                    }
                }
            }
            "getter" => {
                if !has_receiver {
                    return syn::Error::new(method.sig.span(), "#[host_getter] requires &self")
                        .to_compile_error()
                        .into();
                }
                let host_ident = format_ident!("{}_property", ident);
                quote! {
                    #[allow(non_camel_case_types)]
                    pub struct #host_ident;
                    impl #internals::trampoline::HostProperty<#self_ty> for #host_ident {
                        fn get(instance: &#self_ty) -> Result<#internals::object::Object, #internals::error::Error> {
                            Ok(#internals::object::Object::new(&instance.#ident()))
                        }
                    }
                }
            }
            _ => unreachable!(),
        };

        plain_items.push(ImplItem::Fn(method));
        markers.push(marker);
    }

    let mut trimmed_imp = imp.clone();
    trimmed_imp.items = plain_items;

    let expanded = quote! {
        #trimmed_imp
        #(#markers)*
    };
    expanded.into()
}
