//! #[aop_target] 属性宏实现

use crate::utils::{owned_type, return_shape, takes_shared_self, type_text, ReturnShape};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Expr, FnArg, ImplItem, ImplItemFn, ItemImpl, Pat, Visibility};

const ANNOTATED: &str = "annotated";

/// 一个可分派的方法
struct TargetMethod {
    name: String,
    is_public: bool,
    shape: ReturnShape,
    params: Vec<TargetParam>,
    annotations: Vec<Expr>,
}

struct TargetParam {
    name: syn::Ident,
    ty_text: String,
    owned: TokenStream,
    borrowed: bool,
}

/// 实现 #[aop_target] 属性宏
pub fn impl_aop_target(mut item: ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[aop_target] must be placed on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[aop_target] does not support generic impl blocks",
        ));
    }

    let self_ty = item.self_ty.clone();
    let type_name = match &*self_ty {
        syn::Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|seg| seg.ident.to_string())
            .ok_or_else(|| syn::Error::new_spanned(&self_ty, "unsupported self type"))?,
        other => return Err(syn::Error::new_spanned(other, "unsupported self type")),
    };

    let mut methods = Vec::new();
    for impl_item in item.items.iter_mut() {
        if let ImplItem::Fn(method) = impl_item {
            let annotations = take_annotations(method)?;
            if let Some(target_method) = collect_method(method, annotations)? {
                methods.push(target_method);
            }
        }
    }

    let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
    let responds_to = if names.is_empty() {
        quote!(false)
    } else {
        quote!(matches!(method, #(#names)|*))
    };

    let arms = methods.iter().map(dispatch_arm);
    let descriptors = methods.iter().map(|m| descriptor_expr(&type_name, m));

    Ok(quote! {
        #item

        impl ::loom_aop::AopTarget for #self_ty {
            fn type_name(&self) -> &str {
                #type_name
            }

            fn responds_to(&self, method: &str) -> bool {
                #responds_to
            }

            fn invoke(
                &self,
                method: &str,
                args: &[::loom_aop::Value],
            ) -> ::loom_aop::AopResult<::loom_aop::Value> {
                match method {
                    #(#arms)*
                    _ => Err(::loom_aop::AopError::method_not_found(#type_name, method)),
                }
            }
        }

        impl #self_ty {
            /// 类型描述符
            pub fn type_descriptor() -> ::loom_aop::TypeDescriptor {
                ::loom_aop::TypeDescriptor::new(#type_name)
                    #(.method(#descriptors))*
            }
        }
    })
}

/// 取出并移除方法上的 `#[annotated(...)]`
fn take_annotations(method: &mut ImplItemFn) -> syn::Result<Vec<Expr>> {
    let mut annotations = Vec::new();
    let mut kept = Vec::new();

    for attr in method.attrs.drain(..) {
        if attr.path().is_ident(ANNOTATED) {
            annotations.push(attr.parse_args::<Expr>()?);
        } else {
            kept.push(attr);
        }
    }

    method.attrs = kept;
    Ok(annotations)
}

fn collect_method(method: &ImplItemFn, annotations: Vec<Expr>) -> syn::Result<Option<TargetMethod>> {
    let sig = &method.sig;
    if !takes_shared_self(sig) {
        if !annotations.is_empty() {
            return Err(syn::Error::new_spanned(
                &sig.ident,
                "#[annotated] is only supported on `&self` methods",
            ));
        }
        return Ok(None);
    }
    if sig.asyncness.is_some() || !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            sig,
            "#[aop_target] methods must be synchronous and non-generic",
        ));
    }

    let mut params = Vec::new();
    for input in sig.inputs.iter().skip(1) {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };
        let Pat::Ident(pat_ident) = &*pat_type.pat else {
            return Err(syn::Error::new_spanned(
                &pat_type.pat,
                "#[aop_target] requires plain identifier parameters",
            ));
        };
        let (owned, borrowed) = owned_type(&pat_type.ty)?;
        params.push(TargetParam {
            name: pat_ident.ident.clone(),
            ty_text: type_text(&pat_type.ty),
            owned,
            borrowed,
        });
    }

    Ok(Some(TargetMethod {
        name: sig.ident.to_string(),
        is_public: matches!(method.vis, Visibility::Public(_)),
        shape: return_shape(sig),
        params,
        annotations,
    }))
}

/// `invoke` 中一个方法的分派分支
fn dispatch_arm(method: &TargetMethod) -> TokenStream {
    let name = &method.name;
    let ident = format_ident!("{}", method.name);
    let expected = method.params.len();

    let decodes = method.params.iter().enumerate().map(|(index, param)| {
        let var = format_ident!("__arg_{}", param.name);
        let owned = &param.owned;
        let param_name = param.name.to_string();
        quote! {
            let #var: #owned = ::loom_aop::serde_json::from_value(args[#index].clone())
                .map_err(|e| ::loom_aop::AopError::invalid_argument(#name, #param_name, e))?;
        }
    });

    let call_args = method.params.iter().map(|param| {
        let var = format_ident!("__arg_{}", param.name);
        if param.borrowed {
            quote!(&#var)
        } else {
            quote!(#var)
        }
    });

    let call = quote!(self.#ident(#(#call_args),*));
    let result = match method.shape {
        ReturnShape::Unit => quote! {
            #call;
            Ok(::loom_aop::Value::Null)
        },
        ReturnShape::Fallible => quote! {
            let value = #call.map_err(|e| {
                ::loom_aop::AopError::from(::loom_aop::anyhow::Error::from(e))
            })?;
            Ok(::loom_aop::to_value(value)?)
        },
        ReturnShape::Plain => quote! {
            Ok(::loom_aop::to_value(#call)?)
        },
    };

    quote! {
        #name => {
            if args.len() != #expected {
                return Err(::loom_aop::AopError::ArgumentCountMismatch {
                    method: #name.to_string(),
                    expected: #expected,
                    actual: args.len(),
                });
            }
            #(#decodes)*
            #result
        }
    }
}

/// `type_descriptor()` 中一个方法的描述符表达式
fn descriptor_expr(type_name: &str, method: &TargetMethod) -> TokenStream {
    let name = &method.name;
    let params = method.params.iter().map(|param| {
        let param_name = param.name.to_string();
        let ty = &param.ty_text;
        quote!(.param(#param_name, #ty))
    });
    let void = matches!(method.shape, ReturnShape::Unit).then(|| quote!(.returns_void()));
    let private = (!method.is_public).then(|| quote!(.private()));
    let annotations = method
        .annotations
        .iter()
        .map(|expr| quote!(.with_annotation(::loom_aop::Annotation::new(#expr))));

    quote! {
        ::loom_aop::MethodDescriptor::new(#type_name, #name)
            #(#params)*
            #void
            #private
            #(#annotations)*
    }
}
