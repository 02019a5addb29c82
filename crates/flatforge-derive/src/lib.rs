// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Derives producing `flatforge` declarations from Rust types.
//!
//! - `#[derive(FlatTable)]` on structs with named fields
//! - `#[derive(FlatStruct)]` on structs with named fields (`#[flat(value)]`
//!   for `#[repr(C)]` value structs)
//! - `#[derive(FlatEnum)]` on fieldless enums with an integer `#[repr]`
//! - `#[derive(FlatUnion)]` on enums whose variants wrap one type each
//!
//! All of them implement `flatforge::schema::FlatType`. Errors are
//! reported as compile errors on the offending item.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::{Literal, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, ExprUnary, Fields, Ident,
    Lit, LitStr, UnOp,
};

/// Member options parsed from `#[flat(...)]`.
#[derive(Default)]
struct MemberOptions {
    index: Option<u16>,
    default: Option<Expr>,
    key: bool,
    sorted_vector: bool,
    required: bool,
    deprecated: bool,
    force_write: bool,
    write_through: bool,
    shared_string: bool,
}

impl MemberOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("flat")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("index") {
                    let lit: syn::LitInt = meta.value()?.parse()?;
                    options.index = Some(lit.base10_parse()?);
                } else if meta.path.is_ident("default") {
                    options.default = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("key") {
                    options.key = true;
                } else if meta.path.is_ident("sorted_vector") {
                    options.sorted_vector = true;
                } else if meta.path.is_ident("required") {
                    options.required = true;
                } else if meta.path.is_ident("deprecated") {
                    options.deprecated = true;
                } else if meta.path.is_ident("force_write") {
                    options.force_write = true;
                } else if meta.path.is_ident("write_through") {
                    options.write_through = true;
                } else if meta.path.is_ident("shared_string") {
                    options.shared_string = true;
                } else {
                    return Err(meta.error("unknown flat member option"));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }

    /// Struct members only accept an explicit index.
    fn is_struct_compatible(&self) -> bool {
        self.default.is_none()
            && !self.key
            && !self.sorted_vector
            && !self.required
            && !self.deprecated
            && !self.force_write
            && !self.write_through
            && !self.shared_string
    }
}

/// Type-level options parsed from `#[flat(...)]`.
#[derive(Default)]
struct TypeOptions {
    file_identifier: Option<LitStr>,
    value: bool,
    bit_flags: bool,
}

impl TypeOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("flat")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("file_identifier") {
                    let lit: LitStr = meta.value()?.parse()?;
                    if lit.value().len() != 4 || !lit.value().is_ascii() {
                        return Err(syn::Error::new(
                            lit.span(),
                            "file_identifier must be exactly 4 ASCII bytes",
                        ));
                    }
                    options.file_identifier = Some(lit);
                } else if meta.path.is_ident("value") {
                    options.value = true;
                } else if meta.path.is_ident("bit_flags") {
                    options.bit_flags = true;
                } else {
                    return Err(meta.error("unknown flat type option"));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }
}

fn reject_generics(input: &DeriveInput) -> syn::Result<()> {
    if input.generics.params.is_empty() {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.generics,
            "generic flat types are not supported",
        ))
    }
}

fn named_fields<'a>(
    input: &'a DeriveInput,
) -> syn::Result<&'a syn::punctuated::Punctuated<syn::Field, syn::token::Comma>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(input, "only named fields are supported")),
        },
        _ => Err(syn::Error::new_spanned(input, "only structs are supported")),
    }
}

fn named_type_key(name: &str) -> TokenStream2 {
    quote! { ::flatforge::schema::TypeKey::named(#name) }
}

/// `#[derive(FlatTable)]`: a table declaration.
///
/// Members without `index` follow the previous member's slots: one slot
/// for most types, two for unions and vectors of unions.
///
/// ```ignore
/// #[derive(FlatTable)]
/// #[flat(file_identifier = "MONS")]
/// struct Monster {
///     #[flat(index = 0, default = 100)]
///     hp: i16,
///     #[flat(index = 1, key)]
///     name: String,
///     #[flat(index = 2, sorted_vector)]
///     weapons: Option<Vec<Weapon>>,
/// }
/// ```
#[proc_macro_derive(FlatTable, attributes(flat))]
pub fn derive_flat_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_table(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_table(input: &DeriveInput) -> syn::Result<TokenStream2> {
    reject_generics(input)?;
    let name = &input.ident;
    let name_str = name.to_string();
    let type_options = TypeOptions::parse(&input.attrs)?;
    if type_options.value || type_options.bit_flags {
        return Err(syn::Error::new_spanned(
            input,
            "tables accept only file_identifier",
        ));
    }

    let mut members = Vec::new();
    let mut field_types: Vec<syn::Type> = Vec::new();
    // Indices are consts so inference can add the slot count of the
    // previous member type; overflow fails const evaluation.
    let mut indices = Vec::new();
    for (position, field) in named_fields(input)?.iter().enumerate() {
        let Some(field_name) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "field must have a name"));
        };
        let options = MemberOptions::parse(&field.attrs)?;
        let index = format_ident!("FLAT_INDEX_{}", position);
        let value = match (options.index, field_types.last()) {
            (Some(explicit), _) => quote! { #explicit },
            (None, None) => quote! { 0u16 },
            (None, Some(previous)) => {
                let previous_index = format_ident!("FLAT_INDEX_{}", position - 1);
                quote! { #previous_index + <#previous as ::flatforge::schema::FlatType>::SLOTS }
            }
        };
        indices.push(quote! { const #index: u16 = #value; });

        let field_str = field_name.to_string();
        let ty = &field.ty;
        let shared = options
            .shared_string
            .then(|| quote! { .with_shared_strings() });
        let default = options
            .default
            .as_ref()
            .map(|expr| quote! { .with_default(#expr) });
        let flags = [
            (options.key, quote! { .key() }),
            (options.sorted_vector, quote! { .sorted_vector() }),
            (options.required, quote! { .required() }),
            (options.deprecated, quote! { .deprecated() }),
            (options.force_write, quote! { .force_write() }),
            (options.write_through, quote! { .write_through() }),
        ]
        .into_iter()
        .filter_map(|(on, tokens)| on.then_some(tokens));

        members.push(quote! {
            ::flatforge::schema::MemberDeclaration::new(
                #field_str,
                #index,
                <#ty as ::flatforge::schema::FlatType>::type_key() #shared,
            )
            #default
            #(#flags)*
        });
        field_types.push(ty.clone());
    }

    let file_identifier = type_options.file_identifier.map(|lit| {
        let bytes = lit.value().into_bytes();
        quote! { .with_file_identifier([#(#bytes),*]) }
    });
    let type_key = named_type_key(&name_str);

    Ok(quote! {
        impl ::flatforge::schema::FlatType for #name {
            fn type_key() -> ::flatforge::schema::TypeKey {
                #type_key
            }

            fn declare(
                declarations: &mut ::flatforge::schema::Declarations,
            ) -> ::std::result::Result<(), ::flatforge::error::SchemaError> {
                if declarations.contains(#name_str) {
                    return Ok(());
                }
                #(#indices)*
                let table = ::flatforge::schema::TableDeclaration::new(#name_str)
                    #(.member(#members))*
                    #file_identifier;
                declarations.insert(table)?;
                #(<#field_types as ::flatforge::schema::FlatType>::declare(declarations)?;)*
                Ok(())
            }
        }
    })
}

/// `#[derive(FlatStruct)]`: a struct declaration. Fields are laid out in
/// declaration order. With `#[flat(value)]` the struct is a value type and
/// its Rust size and alignment must match the wire layout.
#[proc_macro_derive(FlatStruct, attributes(flat))]
pub fn derive_flat_struct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_struct(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_struct(input: &DeriveInput) -> syn::Result<TokenStream2> {
    reject_generics(input)?;
    let name = &input.ident;
    let name_str = name.to_string();
    let type_options = TypeOptions::parse(&input.attrs)?;
    if type_options.file_identifier.is_some() || type_options.bit_flags {
        return Err(syn::Error::new_spanned(input, "structs accept only value"));
    }

    let mut members = Vec::new();
    let mut field_types = Vec::new();
    for (position, field) in named_fields(input)?.iter().enumerate() {
        let Some(field_name) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "field must have a name"));
        };
        let options = MemberOptions::parse(&field.attrs)?;
        if !options.is_struct_compatible() {
            return Err(syn::Error::new_spanned(
                field,
                "struct members accept only index",
            ));
        }
        let index = match options.index {
            Some(index) => index,
            None => u16::try_from(position)
                .map_err(|_| syn::Error::new(field.span(), "too many struct members"))?,
        };
        let field_str = field_name.to_string();
        let ty = &field.ty;
        members.push(quote! {
            ::flatforge::schema::MemberDeclaration::new(
                #field_str,
                #index,
                <#ty as ::flatforge::schema::FlatType>::type_key(),
            )
        });
        field_types.push(ty.clone());
    }

    let (kind, host_layout, is_value) = if type_options.value {
        (
            quote! { ::flatforge::schema::StructKind::Value },
            quote! { .with_host_layout(::core::mem::size_of::<Self>(), ::core::mem::align_of::<Self>()) },
            true,
        )
    } else {
        (
            quote! { ::flatforge::schema::StructKind::Reference },
            TokenStream2::new(),
            false,
        )
    };
    let type_key = named_type_key(&name_str);

    Ok(quote! {
        impl ::flatforge::schema::FlatType for #name {
            const IS_VALUE_TYPE: bool = #is_value;

            fn type_key() -> ::flatforge::schema::TypeKey {
                #type_key
            }

            fn declare(
                declarations: &mut ::flatforge::schema::Declarations,
            ) -> ::std::result::Result<(), ::flatforge::error::SchemaError> {
                if declarations.contains(#name_str) {
                    return Ok(());
                }
                let declaration = ::flatforge::schema::StructDeclaration::new(#name_str, #kind)
                    #(.member(#members))*
                    #host_layout;
                declarations.insert(declaration)?;
                #(<#field_types as ::flatforge::schema::FlatType>::declare(declarations)?;)*
                Ok(())
            }
        }
    })
}

/// `#[derive(FlatEnum)]`: an enum declaration over the `#[repr]` integer.
/// `#[flat(bit_flags)]` marks a flags enum.
#[proc_macro_derive(FlatEnum, attributes(flat))]
pub fn derive_flat_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_enum(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn scalar_kind(repr: &Ident) -> Option<TokenStream2> {
    let kind = match repr.to_string().as_str() {
        "u8" => quote! { U8 },
        "i8" => quote! { I8 },
        "u16" => quote! { U16 },
        "i16" => quote! { I16 },
        "u32" => quote! { U32 },
        "i32" => quote! { I32 },
        "u64" => quote! { U64 },
        "i64" => quote! { I64 },
        _ => return None,
    };
    Some(quote! { ::flatforge::schema::ScalarKind::#kind })
}

fn enum_repr(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Some(attr) = input.attrs.iter().find(|a| a.path().is_ident("repr")) else {
        return Err(syn::Error::new_spanned(
            input,
            "FlatEnum needs an integer #[repr], e.g. #[repr(u8)]",
        ));
    };
    let repr: Ident = attr.parse_args()?;
    scalar_kind(&repr).ok_or_else(|| syn::Error::new_spanned(&repr, "repr must be an integer type"))
}

fn discriminant_value(expr: &Expr) -> syn::Result<i128> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(lit), ..
        }) => lit.base10_parse(),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => discriminant_value(expr).map(|v| -v),
        Expr::Group(group) => discriminant_value(&group.expr),
        other => Err(syn::Error::new_spanned(
            other,
            "discriminants must be integer literals",
        )),
    }
}

fn expand_enum(input: &DeriveInput) -> syn::Result<TokenStream2> {
    reject_generics(input)?;
    let name = &input.ident;
    let name_str = name.to_string();
    let type_options = TypeOptions::parse(&input.attrs)?;
    if type_options.file_identifier.is_some() || type_options.value {
        return Err(syn::Error::new_spanned(input, "enums accept only bit_flags"));
    }
    let underlying = enum_repr(input)?;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "FlatEnum needs an enum"));
    };

    let mut next = 0i128;
    let mut values = Vec::new();
    let mut arms = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "FlatEnum variants cannot carry data",
            ));
        }
        let value = match &variant.discriminant {
            Some((_, expr)) => discriminant_value(expr)?,
            None => next,
        };
        next = value + 1;
        let ident = &variant.ident;
        let ident_str = ident.to_string();
        let literal = Literal::i128_suffixed(value);
        values.push(quote! { .value(#ident_str, #literal) });
        arms.push(quote! { #literal => ::core::option::Option::Some(Self::#ident), });
    }
    let bit_flags = type_options.bit_flags.then(|| quote! { .bit_flags() });
    let type_key = named_type_key(&name_str);

    Ok(quote! {
        impl ::flatforge::schema::FlatType for #name {
            const IS_VALUE_TYPE: bool = true;

            fn type_key() -> ::flatforge::schema::TypeKey {
                #type_key
            }

            fn declare(
                declarations: &mut ::flatforge::schema::Declarations,
            ) -> ::std::result::Result<(), ::flatforge::error::SchemaError> {
                declarations.insert(
                    ::flatforge::schema::EnumDeclaration::new(#name_str, #underlying)
                        #(#values)*
                        #bit_flags,
                )
            }
        }

        impl ::flatforge::schema::FlatEnum for #name {
            fn to_i128(self) -> i128 {
                self as i128
            }

            fn from_i128(value: i128) -> ::core::option::Option<Self> {
                match value {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

/// `#[derive(FlatUnion)]`: a union declaration. Each variant wraps exactly
/// one alternative type and is named after it (`Monster(Monster)`,
/// `String(String)`), which is what generated code expects.
#[proc_macro_derive(FlatUnion, attributes(flat))]
pub fn derive_flat_union(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_union(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_union(input: &DeriveInput) -> syn::Result<TokenStream2> {
    reject_generics(input)?;
    let name = &input.ident;
    let name_str = name.to_string();
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "FlatUnion needs an enum"));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(input, "unions need at least one variant"));
    }

    let mut alternatives = Vec::new();
    for variant in &data.variants {
        match &variant.fields {
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                alternatives.push(fields.unnamed[0].ty.clone());
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    variant,
                    "union variants must wrap exactly one type",
                ))
            }
        }
    }
    let type_key = named_type_key(&name_str);

    Ok(quote! {
        impl ::flatforge::schema::FlatType for #name {
            const SLOTS: u16 = 2;

            fn type_key() -> ::flatforge::schema::TypeKey {
                #type_key
            }

            fn declare(
                declarations: &mut ::flatforge::schema::Declarations,
            ) -> ::std::result::Result<(), ::flatforge::error::SchemaError> {
                if declarations.contains(#name_str) {
                    return Ok(());
                }
                declarations.insert(
                    ::flatforge::schema::UnionDeclaration::new(#name_str)
                        #(.alternative(<#alternatives as ::flatforge::schema::FlatType>::type_key()))*,
                )?;
                #(<#alternatives as ::flatforge::schema::FlatType>::declare(declarations)?;)*
                Ok(())
            }
        }
    })
}
