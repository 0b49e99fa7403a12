use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, LitStr, parse_macro_input};

struct RecordAttrs {
    name: Option<String>,
    key: Option<String>,
    prefix: Option<String>,
}

struct IndexAttrs {
    kind: Ident,
    name: Option<String>,
    prefix: Option<String>,
}

#[proc_macro_derive(Record, attributes(record, index))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let vis = &input.vis;
    let query_struct_name = format_ident!("__{}Query__", struct_name);

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
            _ => {
                return Err(syn::Error::new_spanned(
                    struct_name,
                    "Record requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "Record can only be derived for structs",
            ));
        }
    };

    let record_attrs = parse_record_attrs(input)?;
    let record_name = record_attrs
        .name
        .unwrap_or_else(|| to_snake_case(&struct_name.to_string()));
    let Some(key) = record_attrs.key else {
        return Err(syn::Error::new_spanned(
            struct_name,
            "missing #[record(key = \"...\")]",
        ));
    };
    let record_prefix = optional_str(&record_attrs.prefix);

    let idents = fields
        .iter()
        .filter_map(|field| field.ident.as_ref())
        .collect::<Vec<_>>();
    let names = idents
        .iter()
        .map(|ident| ident.to_string())
        .collect::<Vec<_>>();

    if !names.contains(&key) {
        return Err(syn::Error::new_spanned(
            struct_name,
            format!("key field `{}` does not exist", key),
        ));
    }

    // 字段类型表
    let field_descriptors = fields.iter().map(|field| {
        let name = field.ident.as_ref().map(|ident| ident.to_string());
        let ty = &field.ty;
        quote! {
            ::redis_record::FieldDescriptor {
                name: #name,
                kind: <#ty as ::redis_record::Field>::KIND,
            }
        }
    });

    // 解析带有 #[index(...)] 属性的字段
    let mut index_descriptors = Vec::new();
    let mut query_methods = Vec::new();
    for field in &fields {
        let Some(index) = parse_index_attrs(field)? else {
            continue;
        };
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let field_name = field_ident.to_string();
        let position = index_descriptors.len();

        let (kind, lookup) = match index.kind.to_string().as_str() {
            "unique" => (quote!(Unique), quote!(UniqueLookup)),
            "set" => (quote!(Set), quote!(SetLookup)),
            "queue" => (quote!(Queue), quote!(QueueLookup)),
            _ => {
                return Err(syn::Error::new_spanned(
                    &index.kind,
                    "index kind must be one of `unique`, `set`, `queue`",
                ));
            }
        };
        let index_name = match &index.name {
            Some(name) => quote!(#name),
            None => quote!(::redis_record::IndexKind::#kind.default_name()),
        };
        let index_prefix = optional_str(&index.prefix);

        index_descriptors.push(quote! {
            ::redis_record::IndexDescriptor {
                kind: ::redis_record::IndexKind::#kind,
                name: #index_name,
                field: #field_name,
                prefix: #index_prefix,
            }
        });

        query_methods.push(quote! {
            pub fn #field_ident(
                &self,
                value: impl Into<::redis_record::Value>,
            ) -> ::redis_record::#lookup<#struct_name> {
                ::redis_record::#lookup::new(
                    &<#struct_name as ::redis_record::Record>::descriptor().indexes[#position],
                    value.into(),
                )
            }
        });
    }

    let field_count = fields.len();
    let index_count = index_descriptors.len();

    let expanded = quote! {
        impl ::redis_record::Record for #struct_name {
            type Query = #query_struct_name;

            fn descriptor() -> &'static ::redis_record::RecordDescriptor {
                static FIELDS: [::redis_record::FieldDescriptor; #field_count] = [#(#field_descriptors),*];
                static INDEXES: [::redis_record::IndexDescriptor; #index_count] = [#(#index_descriptors),*];
                static DESCRIPTOR: ::redis_record::RecordDescriptor = ::redis_record::RecordDescriptor {
                    prefix: #record_prefix,
                    name: #record_name,
                    key: #key,
                    fields: &FIELDS,
                    indexes: &INDEXES,
                };
                &DESCRIPTOR
            }

            fn query() -> #query_struct_name {
                #query_struct_name { _private: () }
            }

            fn to_values(&self) -> ::std::vec::Vec<(&'static str, ::std::option::Option<::redis_record::Value>)> {
                vec![#((#names, ::redis_record::Field::to_value(&self.#idents))),*]
            }

            fn value_of(&self, field: &str) -> ::std::option::Option<::redis_record::Value> {
                match field {
                    #(#names => ::redis_record::Field::to_value(&self.#idents),)*
                    _ => None,
                }
            }

            #[allow(unused_mut)]
            fn from_values(
                mut values: ::redis_record::Values,
            ) -> ::std::result::Result<Self, ::redis_record::Error> {
                Ok(Self {
                    #(#idents: values.take(#names)?,)*
                })
            }
        }

        #[doc(hidden)]
        #vis struct #query_struct_name {
            _private: (),
        }

        impl #query_struct_name {
            #(#query_methods)*
        }

        ::redis_record::inventory::submit! {
            ::redis_record::RecordMeta {
                descriptor: <#struct_name as ::redis_record::Record>::descriptor,
            }
        }
    };

    Ok(expanded)
}

fn parse_record_attrs(input: &DeriveInput) -> syn::Result<RecordAttrs> {
    let mut attrs = RecordAttrs {
        name: None,
        key: None,
        prefix: None,
    };
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            let value = meta.value()?.parse::<LitStr>()?.value();
            if meta.path.is_ident("name") {
                attrs.name = Some(value);
            } else if meta.path.is_ident("key") {
                attrs.key = Some(value);
            } else if meta.path.is_ident("prefix") {
                attrs.prefix = Some(value);
            } else {
                return Err(meta.error("expected `name`, `key` or `prefix`"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn parse_index_attrs(field: &syn::Field) -> syn::Result<Option<IndexAttrs>> {
    let Some(attr) = field.attrs.iter().find(|attr| attr.path().is_ident("index")) else {
        return Ok(None);
    };
    let mut kind = None;
    let mut name = None;
    let mut prefix = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse::<LitStr>()?.value());
        } else if meta.path.is_ident("prefix") {
            prefix = Some(meta.value()?.parse::<LitStr>()?.value());
        } else if let Some(ident) = meta.path.get_ident() {
            if kind.is_some() {
                return Err(meta.error("an index has exactly one kind"));
            }
            kind = Some(ident.clone());
        } else {
            return Err(meta.error("unsupported index option"));
        }
        Ok(())
    })?;
    let kind = kind.ok_or_else(|| {
        syn::Error::new_spanned(attr, "expected #[index(unique)], #[index(set)] or #[index(queue)]")
    })?;
    Ok(Some(IndexAttrs { kind, name, prefix }))
}

fn optional_str(value: &Option<String>) -> proc_macro2::TokenStream {
    match value {
        Some(value) => {
            let value = LitStr::new(value, Span::call_site());
            quote!(::std::option::Option::Some(#value))
        }
        None => quote!(::std::option::Option::None),
    }
}

fn to_snake_case(name: &str) -> String {
    let mut result = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
