//! 代码生成器（CodeEmitter）
//!
//! 接收模板和替换槽，产出可用的方法体。核心不关心方法体如何产生，
//! 只要求槽位替换是精确的。
//!
//! - [`CallableEmitter`]：产出运行时闭包，供 [`ProxyObject`](super::ProxyObject) 直接调用
//! - [`SourceEmitter`]：产出 Rust 源码（TokenStream），供代码生成工具写入文件

use super::proxy::WovenMethod;
use super::template::{parse_ident, MethodTemplate, TemplateConverter, TemplateSlots};
use crate::config::CompilerConfig;
use crate::descriptor::{MethodDescriptor, Parameter};
use crate::error::{AopError, AopResult};
use crate::invocation::MethodInvocation;
use crate::target::AopTarget;
use proc_macro2::TokenStream;
use quote::ToTokens;
use serde_json::Value;
use syn::{FnArg, ImplItemFn, Type};

/// 代码生成器 Trait
pub trait CodeEmitter {
    /// 生成的方法体类型
    type Body;

    /// 用模板和替换槽生成方法体
    fn emit(
        &self,
        method: &MethodDescriptor,
        template: MethodTemplate,
        slots: &TemplateSlots,
    ) -> AopResult<Self::Body>;
}

/// 运行时方法体
pub type CallableBody =
    Box<dyn Fn(&dyn AopTarget, WovenMethod<'_>, &[Value]) -> AopResult<Value> + Send + Sync>;

/// 运行时闭包生成器
///
/// 闭包的行为与源码模板逐句对应：没有拦截器时直接调用目标，
/// 否则构造调用链并 `proceed()`；Void 模板丢弃调用链的结果。
#[derive(Debug, Default, Clone, Copy)]
pub struct CallableEmitter;

impl CodeEmitter for CallableEmitter {
    type Body = CallableBody;

    fn emit(
        &self,
        method: &MethodDescriptor,
        template: MethodTemplate,
        slots: &TemplateSlots,
    ) -> AopResult<CallableBody> {
        tracing::trace!("Emitting callable body for {} ({:?})", method.signature(), template);
        let slots = slots.clone();

        Ok(callable(move |target, woven, args| {
            if args.len() != slots.forward_args.len() {
                return Err(AopError::ArgumentCountMismatch {
                    method: slots.method_name.clone(),
                    expected: slots.forward_args.len(),
                    actual: args.len(),
                });
            }

            if woven.binding.interceptors.is_empty() {
                let forwarded = in_slot_order(&slots.forward_args, args);
                let result = target.invoke(&slots.method_name, &forwarded)?;
                return Ok(match template {
                    MethodTemplate::Return => result,
                    MethodTemplate::ReturnVoid => Value::Null,
                });
            }

            let arguments = in_slot_order(&slots.arg_array, args);
            let invocation = MethodInvocation::new(
                target,
                woven.descriptor,
                arguments,
                &woven.binding.interceptors,
                &woven.binding.annotations,
            )?;

            match template {
                MethodTemplate::Return => invocation.proceed(),
                MethodTemplate::ReturnVoid => {
                    invocation.proceed()?;
                    Ok(Value::Null)
                }
            }
        }))
    }
}

/// 实参按槽位顺序取值，槽位已按参数位置排好序
fn in_slot_order(slots: &[Parameter], args: &[Value]) -> Vec<Value> {
    slots.iter().zip(args).map(|(_, value)| value.clone()).collect()
}

fn callable<F>(body: F) -> CallableBody
where
    F: Fn(&dyn AopTarget, WovenMethod<'_>, &[Value]) -> AopResult<Value> + Send + Sync + 'static,
{
    Box::new(body)
}

/// 源码生成器
///
/// 解析模板、替换三个洞、拼接真实签名，并重新解析校验结果
#[derive(Debug, Clone)]
pub struct SourceEmitter {
    runtime_path: String,
}

impl SourceEmitter {
    pub fn new(runtime_path: impl Into<String>) -> Self {
        Self {
            runtime_path: runtime_path.into(),
        }
    }

    pub fn from_config(config: &CompilerConfig) -> Self {
        Self::new(config.runtime_path.as_str())
    }

    pub fn runtime_path(&self) -> &str {
        &self.runtime_path
    }

    /// 生成参数列表，未声明类型的参数使用运行时的 Value
    fn typed_inputs(&self, slots: &TemplateSlots) -> AopResult<Vec<FnArg>> {
        slots
            .forward_args
            .iter()
            .map(|parameter| {
                let name = parse_ident(&parameter.name)?;
                let ty_source = if parameter.ty.trim().is_empty() {
                    format!("{}::Value", self.runtime_path)
                } else {
                    parameter.ty.clone()
                };
                let ty: Type = syn::parse_str(&ty_source).map_err(|e| {
                    AopError::CodeEmission(format!(
                        "invalid type '{}' for parameter '{}': {}",
                        parameter.ty, parameter.name, e
                    ))
                })?;
                Ok(syn::parse_quote!(#name: #ty))
            })
            .collect()
    }
}

impl Default for SourceEmitter {
    fn default() -> Self {
        Self::from_config(&CompilerConfig::default())
    }
}

impl CodeEmitter for SourceEmitter {
    type Body = TokenStream;

    fn emit(
        &self,
        method: &MethodDescriptor,
        template: MethodTemplate,
        slots: &TemplateSlots,
    ) -> AopResult<TokenStream> {
        tracing::trace!("Emitting source for {} ({:?})", method.signature(), template);

        let mut item = template.parse(&self.runtime_path)?;
        TemplateConverter::new(slots, &self.runtime_path)?.convert(&mut item);

        item.vis = syn::parse_quote!(pub);
        item.sig.inputs.extend(self.typed_inputs(slots)?);

        let tokens = item.to_token_stream();
        syn::parse2::<ImplItemFn>(tokens.clone())
            .map_err(|e| AopError::CodeEmission(format!("{}: {}", method.signature(), e)))?;

        Ok(tokens)
    }
}
