//! Derive macros for di-container
//!
//! `#[derive(Component)]` implements `di_container::Component` for a struct,
//! turning each named field into a constructor parameter.
//!
//! # Example
//!
//! ```rust,ignore
//! use di_container::{Component, Container, TypeRegistry};
//! use std::sync::Arc;
//!
//! #[derive(Component, Default)]
//! struct Mailer;
//!
//! #[derive(Component)]
//! #[component(name = "Admin")]
//! struct AdminUser {
//!     mailer: Arc<Mailer>,
//!     name: String,
//!     #[inject(default = "admin@example.com")]
//!     email: String,
//!     #[inject(skip)]
//!     logins: u64,
//! }
//!
//! let types = TypeRegistry::new();
//! types.register_component::<Mailer>();
//! types.register_component::<AdminUser>();
//!
//! let container = Container::with_types(types);
//! container.set_type("Mailer").unwrap();
//! container.set_type("Admin").unwrap().set_param("name", "root").unwrap();
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, LitStr, Type};

/// Derive macro for the `Component` trait.
///
/// # Field mapping
///
/// | Field type | Parameter |
/// |---|---|
/// | `Arc<T>` | class-typed, resolved as `T`'s name |
/// | integers, floats, `bool`, `String` | primitive `int`/`float`/`bool`/`string` |
/// | `Value` | untyped |
///
/// # Attributes
///
/// - `#[component(name = "...")]` - registered type name (defaults to the struct name)
/// - `#[component(provider)]` - expose the struct's `ServiceProvider` impl
/// - `#[inject(service = "...")]` - type name to resolve for an `Arc<T>` field
/// - `#[inject(default = expr)]` - default used when nothing is bound
/// - `#[inject(skip)]` - not a parameter; filled with `Default::default()`
#[proc_macro_derive(Component, attributes(component, inject))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Component cannot be derived for generic structs",
        ));
    }

    let options = ComponentOptions::parse(&input.attrs)?;
    let type_name = options.name.unwrap_or_else(|| ident.to_string());

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Component can only be derived for structs",
            ));
        }
    };

    let mut params = Vec::new();
    let construct = match fields {
        Fields::Unit => quote!(Self),
        Fields::Named(named) => {
            let mut inits = Vec::new();
            for field in &named.named {
                let (param, init) = field_tokens(field)?;
                params.extend(param);
                inits.push(init);
            }
            quote!(Self { #(#inits),* })
        }
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Component can only be derived for structs with named fields",
            ));
        }
    };

    let provider = options
        .provider
        .then(|| quote!(.service_provider()));

    Ok(quote! {
        impl ::di_container::Component for #ident {
            fn describe() -> ::di_container::DescriptorBuilder<Self> {
                let params: ::std::vec::Vec<::di_container::Parameter> = ::std::vec![#(#params),*];
                ::di_container::TypeDescriptor::builder::<Self>(#type_name)
                    .constructor(params, |args: ::di_container::Arguments| {
                        let _ = &args;
                        ::std::result::Result::Ok(#construct)
                    })
                    #provider
            }
        }
    })
}

/// Parameter declaration (if any) and initializer for one field
fn field_tokens(field: &syn::Field) -> syn::Result<(Option<TokenStream2>, TokenStream2)> {
    let Some(ident) = field.ident.as_ref() else {
        return Err(syn::Error::new_spanned(field, "expected a named field"));
    };
    let name = ident.to_string();
    let ty = &field.ty;
    let options = InjectOptions::parse(&field.attrs)?;

    if options.skip {
        return Ok((None, quote!(#ident: ::std::default::Default::default())));
    }

    let mut param = match classify(ty) {
        FieldKind::Service(inner) => {
            let service = match options.service {
                Some(service) => service,
                None => last_ident(inner)
                    .ok_or_else(|| {
                        syn::Error::new_spanned(
                            inner,
                            "cannot infer a type name; use #[inject(service = \"...\")]",
                        )
                    })?,
            };
            quote!(::di_container::Parameter::typed(#name, #service))
        }
        FieldKind::Primitive(primitive) => {
            quote!(::di_container::Parameter::primitive(#name, #primitive))
        }
        FieldKind::Untyped => quote!(::di_container::Parameter::untyped(#name)),
        FieldKind::Unsupported => {
            return Err(syn::Error::new_spanned(
                ty,
                "unsupported field type: use Arc<T>, a primitive, Value, or #[inject(skip)]",
            ));
        }
    };

    if let Some(default) = options.default {
        param = quote!(#param.with_default(#default));
    }

    Ok((Some(param), quote!(#ident: args.get::<#ty>(#name)?)))
}

enum FieldKind<'a> {
    Service(&'a Type),
    Primitive(&'static str),
    Untyped,
    Unsupported,
}

fn classify(ty: &Type) -> FieldKind<'_> {
    let Type::Path(type_path) = ty else {
        return FieldKind::Unsupported;
    };
    let Some(segment) = type_path.path.segments.last() else {
        return FieldKind::Unsupported;
    };

    if segment.ident == "Arc" {
        if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
            if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                return FieldKind::Service(inner);
            }
        }
        return FieldKind::Unsupported;
    }

    match segment.ident.to_string().as_str() {
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            FieldKind::Primitive("int")
        }
        "f32" | "f64" => FieldKind::Primitive("float"),
        "bool" => FieldKind::Primitive("bool"),
        "String" => FieldKind::Primitive("string"),
        "Value" => FieldKind::Untyped,
        _ => FieldKind::Unsupported,
    }
}

fn last_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

#[derive(Default)]
struct ComponentOptions {
    name: Option<String>,
    provider: bool,
}

impl ComponentOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("component")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    options.name = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else if meta.path.is_ident("provider") {
                    options.provider = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"` or `provider`"))
                }
            })?;
        }
        Ok(options)
    }
}

#[derive(Default)]
struct InjectOptions {
    service: Option<String>,
    default: Option<Expr>,
    skip: bool,
}

impl InjectOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("inject")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("service") {
                    options.service = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else if meta.path.is_ident("default") {
                    options.default = Some(meta.value()?.parse::<Expr>()?);
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    options.skip = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `service = \"...\"`, `default = ...` or `skip`"))
                }
            })?;
        }
        Ok(options)
    }
}
