extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use std::collections::HashMap;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, PathArguments,
    Type,
};

/// Field attributes parsed from `#[biwi(...)]` annotations
///
/// * `id` - The wire field id (required unless the field is skipped)
/// * `default` - Use `Default::default()` when the field is missing during decode
/// * `skip` - Never encode the field; always decode it as `Default::default()`
/// * `skip_default` - Do not encode the field when it equals its default; decode a missing
///   field as the default
#[derive(Debug, Clone, Default)]
struct FieldAttributes {
    id: Option<u32>,
    default: bool,
    skip: bool,
    skip_default: bool,
}

/// A named struct field together with its parsed attributes
struct FieldSpec {
    ident: Ident,
    ty: Type,
    id: u32,
    attrs: FieldAttributes,
}

/// Extract and parse `#[biwi(...)]` attribute values from field attributes
///
/// Multiple attributes can be combined: `#[biwi(id = 3, default)]`
fn get_field_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttributes> {
    let mut parsed = FieldAttributes::default();

    for attr in attrs {
        if !attr.path().is_ident("biwi") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<Ident>()?;

                if ident == "id" {
                    input.parse::<syn::Token![=]>()?;
                    let lit = input.parse::<syn::LitInt>()?;
                    let id = lit.base10_parse::<u32>().map_err(|_| {
                        syn::Error::new(lit.span(), "Field id must fit in u32")
                    })?;
                    parsed.id = Some(id);
                } else if ident == "default" {
                    parsed.default = true;
                } else if ident == "skip" {
                    parsed.skip = true;
                } else if ident == "skip_default" {
                    parsed.skip_default = true;
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("Unknown attribute: {}", ident),
                    ));
                }

                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }

    Ok(parsed)
}

/// Collect the named fields of a struct, checking ids for presence and uniqueness
fn named_fields(input: &DeriveInput, derive_name: &str) -> syn::Result<Vec<FieldSpec>> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(fields) => fields,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    format!("{} can only be derived for structs with named fields", derive_name),
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                format!("{} can only be derived for structs", derive_name),
            ))
        }
    };

    let mut used_ids: HashMap<u32, String> = HashMap::new();
    let mut specs = Vec::with_capacity(fields.named.len());

    for f in &fields.named {
        let Some(ident) = f.ident.clone() else {
            continue;
        };
        let attrs = get_field_attributes(&f.attrs)?;

        let mut field_id = 0;
        if !attrs.skip {
            let Some(id) = attrs.id else {
                return Err(syn::Error::new_spanned(
                    f,
                    format!("Field '{}' needs #[biwi(id = ...)] or #[biwi(skip)]", ident),
                ));
            };
            if let Some(previous) = used_ids.insert(id, ident.to_string()) {
                return Err(syn::Error::new_spanned(
                    f,
                    format!(
                        "Field id {} is used by both '{}' and '{}' in struct '{}'",
                        id, previous, ident, input.ident
                    ),
                ));
            }
            field_id = id;
        }

        specs.push(FieldSpec {
            ident,
            ty: f.ty.clone(),
            id: field_id,
            attrs,
        });
    }

    Ok(specs)
}

/// Extract the inner type `T` from `Option<T>`
///
/// Returns `None` if the type is not an `Option`.
fn extract_inner_type_from_option(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner_ty)) => Some(inner_ty),
            _ => None,
        },
        _ => None,
    }
}

/// Derive macro for implementing the `ToMessage` trait
///
/// # Examples
///
/// ```ignore
/// #[derive(ToMessage)]
/// struct LoginRequest {
///     #[biwi(id = 1)]
///     username: String,
///     #[biwi(id = 2)]
///     password: String,
/// }
/// ```
#[proc_macro_derive(ToMessage, attributes(biwi))]
pub fn derive_to_message(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_to_message(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_to_message(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(input, "ToMessage")?;

    let mut field_encode = Vec::new();
    for field in fields.iter().filter(|f| !f.attrs.skip) {
        let ident = &field.ident;
        let ty = &field.ty;
        let id = field.id;

        if extract_inner_type_from_option(ty).is_some() {
            field_encode.push(quote! {
                if let Some(val) = &self.#ident {
                    message.set_field(#id, biwi::ToValue::to_value(val));
                }
            });
        } else if field.attrs.skip_default {
            field_encode.push(quote! {
                if self.#ident != <#ty as ::core::default::Default>::default() {
                    message.set_field(#id, biwi::ToValue::to_value(&self.#ident));
                }
            });
        } else {
            field_encode.push(quote! {
                message.set_field(#id, biwi::ToValue::to_value(&self.#ident));
            });
        }
    }
    let capacity = field_encode.len();

    Ok(quote! {
        impl #impl_generics biwi::ToMessage for #name #ty_generics #where_clause {
            fn to_message(&self) -> biwi::Message {
                let mut message = biwi::Message::with_capacity(#capacity);
                #(#field_encode)*
                message
            }
        }
    })
}

/// Derive macro for implementing the `FromMessage` trait
///
/// Fields present in the message but unknown to the struct are ignored.
#[proc_macro_derive(FromMessage, attributes(biwi))]
pub fn derive_from_message(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_from_message(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_from_message(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(input, "FromMessage")?;

    let struct_assignments = fields.iter().map(|field| {
        let ident = &field.ident;
        let field_name = ident.to_string();

        if field.attrs.skip {
            return quote! {
                #ident: ::core::default::Default::default(),
            };
        }
        let id = field.id;

        if let Some(inner_ty) = extract_inner_type_from_option(&field.ty) {
            quote! {
                #ident: match message.get_field(#id) {
                    None | Some(biwi::Value::Null) => None,
                    Some(value) => Some(
                        <#inner_ty as biwi::FromValue>::from_value(value).ok_or_else(|| {
                            biwi::FieldError::TypeMismatch {
                                field: #field_name,
                                expected: <#inner_ty as biwi::FromValue>::TYPE_NAME,
                                actual: value.value_type().name(),
                            }
                        })?,
                    ),
                },
            }
        } else {
            let ty = &field.ty;
            let missing = if field.attrs.default || field.attrs.skip_default {
                quote! { ::core::default::Default::default() }
            } else {
                quote! {
                    return Err(biwi::FieldError::MissingRequiredField {
                        field: #field_name,
                        message: #name_str,
                    }
                    .into())
                }
            };
            quote! {
                #ident: match message.get_field(#id) {
                    Some(value) => <#ty as biwi::FromValue>::from_value(value).ok_or_else(|| {
                        biwi::FieldError::TypeMismatch {
                            field: #field_name,
                            expected: <#ty as biwi::FromValue>::TYPE_NAME,
                            actual: value.value_type().name(),
                        }
                    })?,
                    None => #missing,
                },
            }
        }
    });

    Ok(quote! {
        impl #impl_generics biwi::FromMessage for #name #ty_generics #where_clause {
            fn from_message(message: &biwi::Message) -> biwi::Result<Self> {
                Ok(#name {
                    #( #struct_assignments )*
                })
            }
        }
    })
}
