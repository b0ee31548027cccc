//! Procedural macros for schema_merge
//!
//! `#[derive(SchemaModel)]` describes a struct as a table. Struct-level
//! `#[schema(table = "..", schema = "..")]` names the table; field-level `#[schema(..)]`
//! accepts `name`, `type`, `max_length`, `identity`, `key`, `required`, `skip`,
//! `calculated`, `references`, `cascade_delete` and `cascade_update`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    parse_macro_input, Data, DeriveInput, Field, Fields, GenericArgument, LitInt, LitStr,
    PathArguments, Type,
};

/// Derive macro for `schema_merge::models::SchemaModel`
#[proc_macro_derive(SchemaModel, attributes(schema))]
pub fn derive_schema_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct ModelAttrs {
    table: Option<String>,
    schema: Option<String>,
}

#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    db_type: Option<String>,
    max_length: Option<u32>,
    identity: bool,
    key: bool,
    required: bool,
    skip: bool,
    calculated: Option<String>,
    references: Option<String>,
    cascade_delete: bool,
    cascade_update: bool,
}

fn parse_model_attrs(input: &DeriveInput) -> syn::Result<ModelAttrs> {
    let mut attrs = ModelAttrs::default();
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                attrs.table = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("schema") {
                attrs.schema = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error("unsupported schema attribute on a model"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn parse_field_attrs(field: &Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("name") {
                attrs.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("type") {
                attrs.db_type = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("max_length") {
                attrs.max_length = Some(meta.value()?.parse::<LitInt>()?.base10_parse()?);
            } else if path.is_ident("calculated") {
                attrs.calculated = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("references") {
                attrs.references = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if path.is_ident("identity") {
                attrs.identity = true;
            } else if path.is_ident("key") {
                attrs.key = true;
            } else if path.is_ident("required") {
                attrs.required = true;
            } else if path.is_ident("skip") {
                attrs.skip = true;
            } else if path.is_ident("cascade_delete") {
                attrs.cascade_delete = true;
            } else if path.is_ident("cascade_update") {
                attrs.cascade_update = true;
            } else {
                return Err(meta.error("unsupported schema attribute on a field"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

/// The `T` in `Option<T>`, if the type is an option
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) if args.args.len() == 1 => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn quote_option(value: &Option<String>) -> TokenStream2 {
    match value {
        Some(value) => quote!(::core::option::Option::Some(::std::string::String::from(#value))),
        None => quote!(::core::option::Option::None),
    }
}

fn field_definition(field: &Field) -> syn::Result<Option<TokenStream2>> {
    let attrs = parse_field_attrs(field)?;
    if attrs.skip {
        return Ok(None);
    }

    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "SchemaModel fields must be named"))?;
    let name = attrs.name.clone().unwrap_or_else(|| ident.to_string());

    let (inner, is_option) = match option_inner(&field.ty) {
        Some(inner) => (inner, true),
        None => (&field.ty, false),
    };
    let rust_type = inner.to_token_stream().to_string();
    let nullable = is_option && !attrs.required;

    let db_type = quote_option(&attrs.db_type);
    let calculated = quote_option(&attrs.calculated);
    let references = quote_option(&attrs.references);
    let max_length = match attrs.max_length {
        Some(length) => quote!(::core::option::Option::Some(#length)),
        None => quote!(::core::option::Option::None),
    };
    let FieldAttrs {
        identity,
        key,
        cascade_delete,
        cascade_update,
        ..
    } = attrs;

    Ok(Some(quote! {
        ::schema_merge::models::FieldDefinition {
            name: ::std::string::String::from(#name),
            rust_type: ::std::string::String::from(#rust_type),
            db_type: #db_type,
            max_length: #max_length,
            nullable: #nullable,
            identity: #identity,
            key: #key,
            calculated: #calculated,
            references: #references,
            cascade_delete: #cascade_delete,
            cascade_update: #cascade_update,
        }
    }))
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "SchemaModel only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(ident, "SchemaModel only supports structs")),
    };

    let model = parse_model_attrs(&input)?;
    let model_name = ident.to_string();
    let table = model.table.unwrap_or_else(|| model_name.clone());
    let schema = model.schema.unwrap_or_else(|| "dbo".to_string());

    let mut definitions = Vec::new();
    for field in fields {
        if let Some(definition) = field_definition(field)? {
            definitions.push(definition);
        }
    }

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::schema_merge::models::SchemaModel for #ident #ty_generics #where_clause {
            fn definition() -> ::schema_merge::models::ModelDefinition {
                ::schema_merge::models::ModelDefinition {
                    model_name: ::std::string::String::from(#model_name),
                    schema: ::std::string::String::from(#schema),
                    table: ::std::string::String::from(#table),
                    fields: ::std::vec![#(#definitions),*],
                }
            }
        }
    })
}
