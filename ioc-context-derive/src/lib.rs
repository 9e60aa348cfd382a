//! Derive macros for ioc-context
//!
//! - `#[derive(Component)]` - Generate a `Component` impl whose descriptor
//!   has one constructor taking every `#[inject]` field
//!
//! # Example
//!
//! ```rust,ignore
//! use ioc_context::{Component, Context, Descriptors};
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {}
//!
//! #[derive(Component, Default)]
//! #[component(provides(dyn Clock))]
//! struct SystemClock;
//!
//! impl Clock for SystemClock {}
//!
//! #[derive(Component)]
//! struct Scheduler {
//!     #[inject]
//!     clock: Arc<dyn Clock>,
//!     // Non-injected fields use Default
//!     ticks: u64,
//! }
//!
//! let context = Context::new(
//!     Descriptors::new()
//!         .component_of::<SystemClock>()
//!         .component_of::<Scheduler>(),
//! );
//! context.init()?;
//! let scheduler = context.get::<Scheduler>("scheduler")?;
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::parse::Parse;
use syn::{Attribute, Data, DeriveInput, Fields, Token, Type, parse_macro_input};

/// Largest parameter tuple `ioc_context::Params` is implemented for
const MAX_INJECTED: usize = 8;

/// Derive macro for the `Component` trait.
///
/// # Attributes
///
/// - `#[inject]` on a field - The field must be `Arc<T>` (`T` may be a
///   `dyn Trait`). It becomes a constructor parameter, in declaration order.
/// - `#[component(provides(dyn Trait, ...))]` on the struct - Declare
///   capabilities the bean can be injected as. May be repeated.
///
/// Fields without `#[inject]` use `Default::default()`.
///
/// # Generated Code
///
/// ```rust,ignore
/// impl ioc_context::Component for Scheduler {
///     fn descriptor() -> ioc_context::ComponentDescriptor {
///         ioc_context::ComponentDescriptor::of::<Self>()
///             .constructor(|__dep_0: Arc<dyn Clock>| Self {
///                 clock: __dep_0,
///                 ticks: Default::default(),
///             })
///             .build()
///     }
/// }
/// ```
#[proc_macro_derive(Component, attributes(inject, component))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_component(&input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_component(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Component can only be derived for structs",
        ));
    };

    let mut dep_types: Vec<&Type> = Vec::new();
    let mut dep_names: Vec<syn::Ident> = Vec::new();
    let mut field_inits: Vec<TokenStream2> = Vec::new();

    match &data.fields {
        Fields::Named(fields) => {
            for field in &fields.named {
                let Some(field_name) = field.ident.as_ref() else {
                    continue;
                };

                if has_inject_attr(&field.attrs)? {
                    if extract_arc_inner_type(&field.ty).is_none() {
                        return Err(syn::Error::new_spanned(
                            &field.ty,
                            "Fields marked with #[inject] must have type Arc<T>",
                        ));
                    }
                    let dep_name = format_ident!("__dep_{}", dep_names.len());
                    field_inits.push(quote! { #field_name: #dep_name });
                    dep_types.push(&field.ty);
                    dep_names.push(dep_name);
                } else {
                    field_inits.push(quote! {
                        #field_name: ::std::default::Default::default()
                    });
                }
            }
        }
        Fields::Unit => {}
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Component can only be derived for structs with named fields or unit structs",
            ));
        }
    }

    if dep_types.len() > MAX_INJECTED {
        return Err(syn::Error::new_spanned(
            input,
            format!("Component supports at most {MAX_INJECTED} #[inject] fields"),
        ));
    }

    let construct = match &data.fields {
        Fields::Unit => quote! { Self },
        _ => quote! { Self { #(#field_inits),* } },
    };

    let params = match dep_types.len() {
        0 => quote! { _: () },
        1 => {
            let ty = dep_types[0];
            let name = &dep_names[0];
            quote! { #name: #ty }
        }
        _ => {
            let types = &dep_types;
            let names = &dep_names;
            quote! { (#(#names,)*): (#(#types,)*) }
        }
    };

    let provides = parse_provides(&input.attrs)?
        .into_iter()
        .map(|capability| {
            quote! {
                .provides::<#capability, _>(|this| this as ::std::sync::Arc<#capability>)
            }
        });

    Ok(quote! {
        impl #impl_generics ::ioc_context::Component for #name #ty_generics #where_clause {
            fn descriptor() -> ::ioc_context::ComponentDescriptor {
                ::ioc_context::ComponentDescriptor::of::<Self>()
                    .constructor(|#params| #construct)
                    #(#provides)*
                    .build()
            }
        }
    })
}

/// Whether the field carries `#[inject]`; arguments are rejected
fn has_inject_attr(attrs: &[Attribute]) -> syn::Result<bool> {
    for attr in attrs {
        if attr.path().is_ident("inject") {
            attr.meta.require_path_only()?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Collect every type listed in `#[component(provides(...))]`
fn parse_provides(attrs: &[Attribute]) -> syn::Result<Vec<Type>> {
    let mut provided = Vec::new();

    for attr in attrs {
        if !attr.path().is_ident("component") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("provides") {
                let content;
                syn::parenthesized!(content in meta.input);
                let types = content.parse_terminated(Type::parse, Token![,])?;
                provided.extend(types);
                Ok(())
            } else {
                Err(meta.error("unsupported component attribute, expected `provides(...)`"))
            }
        })?;
    }

    Ok(provided)
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == "Arc" {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return Some(inner);
                }
            }
        }
    }
    None
}
