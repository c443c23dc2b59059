use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Type};

/// Derive macro for plugin config parameter declarations.
///
/// Generates two methods on the annotated struct:
///
/// - `config_params() -> Vec<ConfigParam>` — parameter declarations for FFI export.
/// - `from_config(&ConfigValues) -> Result<Self, PluginError>` — reads typed values.
///
/// The struct must implement `Default` (defaults are used for non-required params).
/// Keys default to the field name; task properties use dotted keys, which are
/// given with `key = "..."`.
///
/// # Example
///
/// ```ignore
/// #[derive(ConfigParams)]
/// pub struct WriterConfig {
///     #[param(key = "etl.output.record.delimiter", description = "Record delimiter")]
///     pub record_delimiter: String,
///
///     #[param(required, description = "Spool directory")]
///     pub spool_dir: String,
/// }
/// ```
///
/// Supported field types: `bool`, `i64`, `u64`, `usize`, `String`.
#[proc_macro_derive(ConfigParams, attributes(param))]
pub fn derive_config_params(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

/// Parsed `#[param(...)]` attribute of one field.
struct ParamAttr {
    key: Option<String>,
    description: Option<String>,
    required: bool,
}

fn parse_param_attr(field: &syn::Field) -> Result<ParamAttr, syn::Error> {
    let mut attr_out = ParamAttr {
        key: None,
        description: None,
        required: false,
    };
    for attr in &field.attrs {
        if !attr.path().is_ident("param") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key") {
                let value: LitStr = meta.value()?.parse()?;
                attr_out.key = Some(value.value());
            } else if meta.path.is_ident("description") {
                let value: LitStr = meta.value()?.parse()?;
                attr_out.description = Some(value.value());
            } else if meta.path.is_ident("required") {
                attr_out.required = true;
            } else {
                return Err(meta.error("unknown param attribute (expected key, description, required)"));
            }
            Ok(())
        })?;
    }
    Ok(attr_out)
}

/// Per-type code fragments: declared type, default value, and a lookup
/// expression producing `Option<FieldType>` from `__config`.
struct TypeCodegen {
    param_type: TokenStream2,
    default_value: TokenStream2,
    lookup: TokenStream2,
}

fn type_codegen(ty_name: &str, field_name: &syn::Ident, key: &str) -> Option<TypeCodegen> {
    let cg = match ty_name {
        "bool" => TypeCodegen {
            param_type: quote! { sluice_api::config::ParamType::Bool },
            default_value: quote! { sluice_api::config::ParamValue::Bool(__defaults.#field_name) },
            lookup: quote! { __config.get_bool(#key) },
        },
        "i64" => TypeCodegen {
            param_type: quote! { sluice_api::config::ParamType::I64 },
            default_value: quote! { sluice_api::config::ParamValue::I64(__defaults.#field_name) },
            lookup: quote! { __config.get_i64(#key) },
        },
        "u64" => TypeCodegen {
            param_type: quote! { sluice_api::config::ParamType::U64 },
            default_value: quote! { sluice_api::config::ParamValue::U64(__defaults.#field_name) },
            lookup: quote! { __config.get_u64(#key) },
        },
        "usize" => TypeCodegen {
            param_type: quote! { sluice_api::config::ParamType::U64 },
            default_value: quote! {
                sluice_api::config::ParamValue::U64(__defaults.#field_name as u64)
            },
            lookup: quote! { __config.get_u64(#key).map(|v| v as usize) },
        },
        "String" => TypeCodegen {
            param_type: quote! { sluice_api::config::ParamType::Str },
            default_value: quote! {
                sluice_api::config::ParamValue::Str(__defaults.#field_name.clone())
            },
            lookup: quote! { __config.get_str(#key).map(|v| v.to_string()) },
        },
        _ => return None,
    };
    Some(cg)
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "ConfigParams only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "ConfigParams only supports structs",
            ))
        }
    };

    let mut config_param_tokens = Vec::new();
    let mut from_config_tokens = Vec::new();

    for field in fields {
        let field_name = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "expected named field")
        })?;

        let attr = parse_param_attr(field)?;
        let key = attr.key.unwrap_or_else(|| field_name.to_string());
        let description = attr.description.ok_or_else(|| {
            syn::Error::new_spanned(field_name, "missing #[param(description = \"...\")]")
        })?;
        let required = attr.required;

        let ty_name = type_ident_name(&field.ty).ok_or_else(|| {
            syn::Error::new_spanned(&field.ty, "unsupported type for ConfigParams")
        })?;
        let TypeCodegen {
            param_type,
            default_value,
            lookup,
        } = type_codegen(&ty_name, field_name, &key).ok_or_else(|| {
            syn::Error::new_spanned(
                &field.ty,
                format!("unsupported type '{ty_name}' (expected bool, i64, u64, usize, String)"),
            )
        })?;

        let default_expr = if required {
            quote! { None }
        } else {
            quote! { Some(#default_value) }
        };

        config_param_tokens.push(quote! {
            sluice_api::config::ConfigParam {
                name: #key.to_string(),
                param_type: #param_type,
                required: #required,
                default: #default_expr,
                description: #description.to_string(),
            }
        });

        from_config_tokens.push(if required {
            quote! {
                result.#field_name = #lookup.ok_or_else(|| {
                    sluice_api::error::PluginError::config(
                        format!("missing required parameter '{}'", #key)
                    )
                })?;
            }
        } else {
            quote! {
                if let Some(v) = #lookup {
                    result.#field_name = v;
                }
            }
        });
    }

    let expanded = quote! {
        impl #name {
            pub fn config_params() -> Vec<sluice_api::config::ConfigParam> {
                let __defaults = Self::default();
                vec![
                    #(#config_param_tokens),*
                ]
            }

            pub fn from_config(
                __config: &sluice_api::config::ConfigValues,
            ) -> Result<Self, sluice_api::error::PluginError> {
                let mut result = Self::default();
                #(#from_config_tokens)*
                Ok(result)
            }
        }
    };

    Ok(TokenStream::from(expanded))
}

/// Extract the last path segment ident name from a type (e.g. `u64`, `String`).
fn type_ident_name(ty: &Type) -> Option<String> {
    if let Type::Path(type_path) = ty {
        type_path
            .path
            .segments
            .last()
            .map(|seg| seg.ident.to_string())
    } else {
        None
    }
}
