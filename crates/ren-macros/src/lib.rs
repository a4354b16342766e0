use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, AttributeArgs, FnArg, ItemFn, Lit, Meta, MetaNameValue, NestedMeta, Pat};

/// Attribute used to mark functions as Ren natives.
///
/// Example:
/// ```rust,ignore
/// use ren_macros::native;
///
/// #[native(name = "add", doc = "Add two integers")]
/// fn add(a: i64, b: i64) -> i64 {
///     a + b
/// }
///
/// #[native(name = "greet", spec = "who [string!] \"Name to greet\"")]
/// fn greet(who: String) -> String {
///     format!("hello {who}")
/// }
/// ```
///
/// Without `spec` the specification is inferred from the parameter names and
/// types (`a [integer!] b [integer!]`). The function is submitted to the
/// `ren-bind` native inventory and picked up by `bind_natives`.
#[proc_macro_attribute]
pub fn native(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as AttributeArgs);
    let mut name: Option<String> = None;
    let mut spec: Option<String> = None;
    let mut doc: Option<String> = None;

    for arg in args {
        match arg {
            NestedMeta::Meta(Meta::NameValue(MetaNameValue { path, lit, .. })) => {
                let value = match lit {
                    Lit::Str(s) => s.value(),
                    _ => panic!("`{}` must be a string literal", quote!(#path)),
                };
                if path.is_ident("name") {
                    name = Some(value);
                } else if path.is_ident("spec") {
                    spec = Some(value);
                } else if path.is_ident("doc") {
                    doc = Some(value);
                } else {
                    panic!("unknown attribute parameter: {}", quote!(#path));
                }
            }
            _ => panic!("expected `name = \"...\"`, `spec = \"...\"` or `doc = \"...\"`"),
        }
    }

    let func: ItemFn = parse_macro_input!(input as ItemFn);
    let ident = &func.sig.ident;
    let name = name.unwrap_or_else(|| ident.to_string().replace('_', "-"));

    // Spec words follow Ren spelling: `max_len` becomes `max-len`
    let mut param_names = Vec::new();
    for arg in &func.sig.inputs {
        match arg {
            FnArg::Typed(pt) => {
                if let Pat::Ident(pi) = pt.pat.as_ref() {
                    param_names.push(pi.ident.to_string().replace('_', "-"));
                } else {
                    panic!("parameters must be simple identifiers");
                }
                check_owned(&pt.ty);
            }
            _ => panic!("self parameter not allowed"),
        }
    }

    let build_spec: proc_macro2::TokenStream = match spec {
        Some(text) => quote! {
            ::ren_bind::Specification::parse(#text)?
        },
        None => quote! {
            <::ren_bind::Specification as ::ren_bind::SpecificationExt>::infer(
                &#ident,
                &[#(#param_names),*],
            )?
        },
    };
    let with_doc = doc.map(|text| quote! { let spec = spec.with_description(#text); });

    let register_ident = format_ident!("__ren_register_{}", ident);

    let register = quote! {
        #[doc(hidden)]
        fn #register_ident(
            engine: &::ren_bind::Engine,
        ) -> ::std::result::Result<::ren_bind::Function, ::ren_bind::BindError> {
            let spec = #build_spec;
            #with_doc
            ::ren_bind::make_function_with(engine, &spec, ::ren_bind::ren_shim!(), #ident)
        }

        ::ren_bind::inventory::submit! {
            ::ren_bind::NativeDefinition {
                name: #name,
                register: #register_ident,
            }
        }
    };

    TokenStream::from(quote! {
        #func
        #register
    })
}

/// Arguments are decoded into owned values; borrowed parameter types cannot
/// outlive the call stack they would point into.
fn check_owned(ty: &syn::Type) {
    match ty {
        syn::Type::Reference(_) => {
            panic!("native parameters must be owned types, found {}", quote!(#ty))
        }
        syn::Type::Slice(_) | syn::Type::Ptr(_) | syn::Type::ImplTrait(_) => {
            panic!("unsupported native parameter type {}", quote!(#ty))
        }
        _ => {}
    }
}
