//! Procedural macros for table_sync
//!
//! This crate provides the `TableSchema` derive, which implements
//! `table_sync::TableModel` from a struct's fields.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, ExprUnary, Fields,
    GenericArgument, Lit, LitStr, PathArguments, Type, UnOp,
};

/// Derive `table_sync::TableModel` for a struct with named fields.
///
/// ```ignore
/// #[derive(TableSchema)]
/// #[table_sync(table = "users")]
/// struct User {
///     #[column(primary_key, autoincrement)]
///     id: i32,
///     #[column(length = 255, unique)]
///     email: String,
///     nickname: Option<String>,
///     #[column(default_current_timestamp)]
///     created_at: Option<chrono::NaiveDateTime>,
/// }
/// ```
///
/// Field types pick the column type unless `type = "..."` is given.
/// `Option<T>` fields are nullable and other fields NOT NULL, except that a
/// field with a default is always nullable.
#[proc_macro_derive(TableSchema, attributes(table_sync, column))]
pub fn derive_table_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "TableSchema only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "TableSchema only supports structs",
            ))
        }
    };

    let table = table_name(&input.attrs)?.unwrap_or_else(|| to_snake_case(&name.to_string()));

    let mut columns = Vec::new();
    for field in fields {
        let ident = match &field.ident {
            Some(ident) => ident,
            None => continue,
        };
        let attrs = ColumnAttrs::from_attributes(&field.attrs)?;
        columns.push(column_tokens(&ident.to_string(), &field.ty, &attrs)?);
    }

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::table_sync::TableModel for #name #ty_generics #where_clause {
            fn table_name() -> ::std::string::String {
                ::std::string::String::from(#table)
            }

            fn table_definition() -> ::table_sync::TableDefinition {
                ::table_sync::TableDefinition::new()
                    #(.with_column(#columns))*
            }
        }
    })
}

/// `#[table_sync(table = "...")]` on the struct
fn table_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut table = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("table_sync")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                table = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("expected `table = \"...\"`"))
            }
        })?;
    }
    Ok(table)
}

#[derive(Default)]
struct ColumnAttrs {
    rename: Option<String>,
    column_type: Option<String>,
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
    nullable: Option<bool>,
    default: Option<TokenStream2>,
    default_current_timestamp: bool,
    primary_key: bool,
    unique: bool,
    index: bool,
    autoincrement: bool,
}

impl ColumnAttrs {
    fn from_attributes(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = ColumnAttrs::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("column")) {
            attr.parse_nested_meta(|meta| {
                let path = &meta.path;
                if path.is_ident("rename") {
                    parsed.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if path.is_ident("type") {
                    parsed.column_type = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if path.is_ident("length") {
                    parsed.length = Some(meta.value()?.parse::<syn::LitInt>()?.base10_parse()?);
                } else if path.is_ident("precision") {
                    parsed.precision =
                        Some(meta.value()?.parse::<syn::LitInt>()?.base10_parse()?);
                } else if path.is_ident("scale") {
                    parsed.scale = Some(meta.value()?.parse::<syn::LitInt>()?.base10_parse()?);
                } else if path.is_ident("nullable") {
                    parsed.nullable = Some(if meta.input.peek(syn::Token![=]) {
                        meta.value()?.parse::<syn::LitBool>()?.value
                    } else {
                        true
                    });
                } else if path.is_ident("default") {
                    let expr: Expr = meta.value()?.parse()?;
                    parsed.default = Some(default_tokens(&expr)?);
                } else if path.is_ident("default_current_timestamp") {
                    parsed.default_current_timestamp = true;
                } else if path.is_ident("primary_key") {
                    parsed.primary_key = true;
                } else if path.is_ident("unique") {
                    parsed.unique = true;
                } else if path.is_ident("index") {
                    parsed.index = true;
                } else if path.is_ident("autoincrement") {
                    parsed.autoincrement = true;
                } else {
                    return Err(meta.error("unknown column attribute"));
                }
                Ok(())
            })?;
        }

        let roles = [parsed.primary_key, parsed.unique, parsed.index];
        if roles.iter().filter(|r| **r).count() > 1 {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "a column takes at most one of `primary_key`, `unique` and `index`",
            ));
        }
        if parsed.default.is_some() && parsed.default_current_timestamp {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "`default` and `default_current_timestamp` are exclusive",
            ));
        }

        Ok(parsed)
    }
}

/// Tokens building a `DefaultValue` from a literal expression
fn default_tokens(expr: &Expr) -> syn::Result<TokenStream2> {
    let (negative, lit) = match expr {
        Expr::Lit(ExprLit { lit, .. }) => (false, lit),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => match expr.as_ref() {
            Expr::Lit(ExprLit { lit, .. }) => (true, lit),
            other => return Err(syn::Error::new_spanned(other, "expected a literal default")),
        },
        other => return Err(syn::Error::new_spanned(other, "expected a literal default")),
    };

    match lit {
        Lit::Str(s) if !negative => {
            let value = s.value();
            Ok(quote!(::table_sync::DefaultValue::Text(::std::string::String::from(#value))))
        }
        Lit::Bool(b) if !negative => {
            let value = b.value;
            Ok(quote!(::table_sync::DefaultValue::Boolean(#value)))
        }
        Lit::Int(i) => {
            let value: i64 = i.base10_parse()?;
            let value = if negative { -value } else { value };
            Ok(quote!(::table_sync::DefaultValue::Integer(#value)))
        }
        Lit::Float(f) => {
            let value: f64 = f.base10_parse()?;
            let value = if negative { -value } else { value };
            Ok(quote!(::table_sync::DefaultValue::Float(#value)))
        }
        other => Err(syn::Error::new_spanned(other, "unsupported default literal")),
    }
}

/// Strip `Option<...>`, reporting whether it was there
fn unwrap_option(ty: &Type) -> (bool, &Type) {
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "Option" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return (true, inner);
                    }
                }
            }
        }
    }
    (false, ty)
}

/// Canonical column type for a Rust field type
fn canonical_type(ty: &Type, has_length: bool) -> Option<&'static str> {
    if let Type::Reference(reference) = ty {
        return canonical_type(&reference.elem, has_length);
    }
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;

    let tag = match segment.ident.to_string().as_str() {
        "i8" | "i16" | "u8" => "smallint",
        "i32" | "u16" => "integer",
        "i64" | "u32" | "u64" | "isize" | "usize" => "bigint",
        "f32" => "float",
        "f64" => "double",
        "bool" => "boolean",
        "String" | "str" if has_length => "varchar",
        "String" | "str" => "text",
        "char" => "char",
        "NaiveDate" => "date",
        "NaiveTime" => "time",
        "NaiveDateTime" | "PrimitiveDateTime" => "datetime",
        "DateTime" | "OffsetDateTime" => "timestamp",
        "Decimal" | "BigDecimal" => "numeric",
        "Value" => "json",
        "Vec" => match &segment.arguments {
            PathArguments::AngleBracketed(args)
                if args
                    .args
                    .first()
                    .map_or(false, |a| a.to_token_stream().to_string() == "u8") =>
            {
                "blob"
            }
            _ => return None,
        },
        _ => return None,
    };
    Some(tag)
}

fn quote_option<T: ToTokens>(value: &Option<T>) -> TokenStream2 {
    match value {
        Some(v) => quote!(::std::option::Option::Some(#v)),
        None => quote!(::std::option::Option::None),
    }
}

fn column_tokens(field: &str, ty: &Type, attrs: &ColumnAttrs) -> syn::Result<TokenStream2> {
    let name = attrs.rename.clone().unwrap_or_else(|| field.to_string());
    let (optional, inner) = unwrap_option(ty);

    let column_type = match &attrs.column_type {
        Some(tag) => tag.clone(),
        None => canonical_type(inner, attrs.length.is_some())
            .map(str::to_string)
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    ty,
                    "cannot infer a column type, add #[column(type = \"...\")]",
                )
            })?,
    };

    let length = match (attrs.length, column_type.as_str()) {
        (None, "char") if attrs.column_type.is_none() => Some(1),
        (length, _) => length,
    };

    let default = if attrs.default_current_timestamp {
        Some(quote!(::table_sync::DefaultValue::CurrentTimestamp))
    } else {
        attrs.default.clone()
    };
    let nullable = attrs.nullable.unwrap_or(optional || default.is_some());

    let length = quote_option(&length);
    let precision = quote_option(&attrs.precision);
    let scale = quote_option(&attrs.scale);
    let default = quote_option(&default);
    let autoincrement = attrs.autoincrement;
    let key_role = if attrs.primary_key {
        quote!(::table_sync::KeyRole::Primary)
    } else if attrs.unique {
        quote!(::table_sync::KeyRole::Unique)
    } else if attrs.index {
        quote!(::table_sync::KeyRole::Multi)
    } else {
        quote!(::table_sync::KeyRole::None)
    };

    Ok(quote! {{
        let mut column = ::table_sync::ColumnDefinition::new(#name, #column_type);
        column.length = #length;
        column.precision = #precision;
        column.scale = #scale;
        column.nullable = #nullable;
        column.default = #default;
        column.key_role = #key_role;
        column.autoincrement = #autoincrement;
        column
    }})
}

/// `UserAccount` -> `user_account`
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let after_lower = i > 0 && !chars[i - 1].is_uppercase() && chars[i - 1] != '_';
            let before_lower = i > 0
                && chars[i - 1].is_uppercase()
                && chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            if after_lower || before_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}
