//! 方法模板
//!
//! 代理方法体只有两种模板：有返回值（Return）和无返回值（ReturnVoid），
//! 模板中有三个固定的洞：
//! 1. `template_method` —— 真实方法名
//! 2. `template_method(...)` 调用处的实参列表 —— 转发的位置参数
//! 3. `MethodInvocation::new` 的第三个参数 —— 调用链捕获的参数数组

use crate::descriptor::{MethodDescriptor, Parameter, ReturnKind};
use crate::error::{AopError, AopResult};
use proc_macro2::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::visit_mut::{self, VisitMut};
use syn::{Expr, ExprCall, ExprMethodCall, Ident, ImplItemFn, LitStr, Token};

/// 模板中代表真实方法名的占位符
pub const TEMPLATE_METHOD: &str = "template_method";

/// 模板中代表运行时 crate 路径的占位符
const RUNTIME_PLACEHOLDER: &str = "__rt";

const RETURN: &str = r#"
fn template_method(&self) -> __rt::AopResult<__rt::Value> {
    let woven = self.weaving().woven("template_method")?;
    if woven.binding.interceptors.is_empty() {
        return Ok(__rt::to_value(self.target().template_method())?);
    }
    let invocation = __rt::MethodInvocation::new(
        self.target(),
        woven.descriptor,
        vec![],
        &woven.binding.interceptors,
        &woven.binding.annotations,
    )?;
    invocation.proceed()
}
"#;

const RETURN_VOID: &str = r#"
fn template_method(&self) -> __rt::AopResult<()> {
    let woven = self.weaving().woven("template_method")?;
    if woven.binding.interceptors.is_empty() {
        self.target().template_method();
        return Ok(());
    }
    let invocation = __rt::MethodInvocation::new(
        self.target(),
        woven.descriptor,
        vec![],
        &woven.binding.interceptors,
        &woven.binding.annotations,
    )?;
    invocation.proceed()?;
    Ok(())
}
"#;

/// 方法模板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodTemplate {
    /// 执行调用链并返回结果
    Return,
    /// 执行调用链，丢弃结果
    ReturnVoid,
}

impl MethodTemplate {
    /// 按目标方法声明的返回值种类选择模板
    pub fn for_method(method: &MethodDescriptor) -> Self {
        match method.return_kind {
            ReturnKind::Void => MethodTemplate::ReturnVoid,
            ReturnKind::Value => MethodTemplate::Return,
        }
    }

    /// 模板源码
    pub fn source(&self) -> &'static str {
        match self {
            MethodTemplate::Return => RETURN,
            MethodTemplate::ReturnVoid => RETURN_VOID,
        }
    }

    /// 解析模板，运行时路径替换为 `runtime_path`
    pub fn parse(&self, runtime_path: &str) -> AopResult<ImplItemFn> {
        let source = self.source().replace(RUNTIME_PLACEHOLDER, runtime_path);
        syn::parse_str::<ImplItemFn>(&source)
            .map_err(|e| AopError::CodeEmission(format!("invalid {:?} template: {}", self, e)))
    }
}

/// 模板替换槽
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSlots {
    /// 真实方法名
    pub method_name: String,

    /// 调用处转发的位置参数
    pub forward_args: Vec<Parameter>,

    /// 调用链捕获的参数数组
    pub arg_array: Vec<Parameter>,
}

impl TemplateSlots {
    pub fn from_method(method: &MethodDescriptor) -> Self {
        let mut parameters = method.parameters.clone();
        parameters.sort_by_key(|p| p.position);

        Self {
            method_name: method.name.clone(),
            forward_args: parameters.clone(),
            arg_array: parameters,
        }
    }
}

/// 模板转换器
///
/// 遍历模板语法树，把三个洞替换成具体方法的内容
pub struct TemplateConverter {
    method: Ident,
    method_literal: String,
    forward_args: Punctuated<Expr, Token![,]>,
    arg_array: Expr,
}

impl TemplateConverter {
    pub fn new(slots: &TemplateSlots, runtime_path: &str) -> AopResult<Self> {
        let method = parse_ident(&slots.method_name)?;
        let runtime: syn::Path = syn::parse_str(runtime_path)
            .map_err(|e| AopError::CodeEmission(format!("invalid runtime path '{}': {}", runtime_path, e)))?;

        let mut forward_args = Punctuated::new();
        for parameter in &slots.forward_args {
            let name = parse_ident(&parameter.name)?;
            forward_args.push(syn::parse_quote!(#name));
        }

        let mut items: Vec<TokenStream> = Vec::new();
        for parameter in &slots.arg_array {
            let name = parse_ident(&parameter.name)?;
            items.push(quote!(#runtime::to_value(&#name)?));
        }
        let arg_array: Expr = syn::parse2(quote!(vec![#(#items),*]))
            .map_err(|e| AopError::CodeEmission(e.to_string()))?;

        Ok(Self {
            method,
            method_literal: slots.method_name.clone(),
            forward_args,
            arg_array,
        })
    }

    /// 转换模板方法
    pub fn convert(&mut self, item: &mut ImplItemFn) {
        self.visit_impl_item_fn_mut(item);
        item.sig.ident = self.method.clone();
    }
}

impl VisitMut for TemplateConverter {
    fn visit_expr_method_call_mut(&mut self, node: &mut ExprMethodCall) {
        visit_mut::visit_expr_method_call_mut(self, node);
        if node.method == TEMPLATE_METHOD {
            node.method = self.method.clone();
            node.args = self.forward_args.clone();
        }
    }

    fn visit_expr_call_mut(&mut self, node: &mut ExprCall) {
        visit_mut::visit_expr_call_mut(self, node);
        if is_invocation_constructor(&node.func) {
            if let Some(arg) = node.args.iter_mut().nth(2) {
                *arg = self.arg_array.clone();
            }
        }
    }

    fn visit_lit_str_mut(&mut self, node: &mut LitStr) {
        if node.value() == TEMPLATE_METHOD {
            *node = LitStr::new(&self.method_literal, node.span());
        }
    }
}

/// 是否是 `MethodInvocation::new`
fn is_invocation_constructor(func: &Expr) -> bool {
    let Expr::Path(path) = func else {
        return false;
    };
    let segments: Vec<_> = path.path.segments.iter().map(|s| s.ident.to_string()).collect();
    segments.ends_with(&["MethodInvocation".to_string(), "new".to_string()])
}

/// 解析标识符，关键字和非法名称都会报错
pub(crate) fn parse_ident(name: &str) -> AopResult<Ident> {
    syn::parse_str::<Ident>(name)
        .map_err(|_| AopError::CodeEmission(format!("'{}' is not a valid identifier", name)))
}
