//! 代理编译器（ProxyCompiler）
//!
//! 根据绑定注册表和目标类型的方法描述符合成代理：
//! 每个被绑定的公开方法用固定模板替换方法体，
//! 未绑定的公开方法作为透传成员保留，非公开方法不进入代理。

pub mod emitter;
pub mod proxy;
pub mod template;

pub use emitter::{CallableBody, CallableEmitter, CodeEmitter, SourceEmitter};
pub use proxy::{ProxyObject, Weaving, WovenMethod};
pub use template::{MethodTemplate, TemplateConverter, TemplateSlots};

use crate::bind::Bind;
use crate::config::CompilerConfig;
use crate::descriptor::{MethodDescriptor, MethodIdentity};
use crate::error::{AopError, AopResult};
use crate::inspector::TypeInspector;
use crate::target::AopTarget;
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// 代理中的一个方法
pub enum ProxyMethod<B> {
    /// 经过调用链的方法
    Intercepted {
        descriptor: MethodDescriptor,
        identity: MethodIdentity,
        template: MethodTemplate,
        slots: TemplateSlots,
        body: B,
    },
    /// 原样转发的方法
    Passthrough { descriptor: MethodDescriptor },
}

impl<B> ProxyMethod<B> {
    pub fn descriptor(&self) -> &MethodDescriptor {
        match self {
            ProxyMethod::Intercepted { descriptor, .. } => descriptor,
            ProxyMethod::Passthrough { descriptor } => descriptor,
        }
    }

    pub fn template(&self) -> Option<MethodTemplate> {
        match self {
            ProxyMethod::Intercepted { template, .. } => Some(*template),
            ProxyMethod::Passthrough { .. } => None,
        }
    }

    pub fn is_intercepted(&self) -> bool {
        matches!(self, ProxyMethod::Intercepted { .. })
    }
}

impl<B> fmt::Debug for ProxyMethod<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyMethod::Intercepted {
                descriptor,
                identity,
                template,
                ..
            } => f
                .debug_struct("Intercepted")
                .field("method", &descriptor.signature())
                .field("binding", &identity.to_string())
                .field("template", template)
                .finish(),
            ProxyMethod::Passthrough { descriptor } => f
                .debug_struct("Passthrough")
                .field("method", &descriptor.signature())
                .finish(),
        }
    }
}

/// 编译产物：一个完整的代理类型
pub struct CompiledProxy<B> {
    pub proxy_name: String,
    pub target_type: String,
    pub methods: Vec<ProxyMethod<B>>,
    weaving: Weaving,
}

impl<B> CompiledProxy<B> {
    /// 按名称查找代理方法
    pub fn method(&self, name: &str) -> Option<&ProxyMethod<B>> {
        self.methods.iter().find(|m| m.descriptor().name == name)
    }

    /// 被拦截的方法
    pub fn intercepted(&self) -> impl Iterator<Item = &ProxyMethod<B>> {
        self.methods.iter().filter(|m| m.is_intercepted())
    }

    /// 运行时分派表
    pub fn weaving(&self) -> &Weaving {
        &self.weaving
    }
}

impl CompiledProxy<CallableBody> {
    /// 用目标对象实例化代理
    pub fn instantiate(self, target: Arc<dyn AopTarget>) -> ProxyObject {
        ProxyObject::new(self, target)
    }
}

impl CompiledProxy<TokenStream> {
    /// 生成代理类型的完整源码
    ///
    /// 被绑定的方法生成在代理的 impl 块中；未绑定的方法通过 Deref
    /// 落到目标类型上，保持原样
    pub fn to_tokens(&self, runtime_path: &str) -> AopResult<TokenStream> {
        let runtime: syn::Path = syn::parse_str(runtime_path)
            .map_err(|e| AopError::CodeEmission(format!("invalid runtime path '{}': {}", runtime_path, e)))?;
        let proxy = template::parse_ident(&self.proxy_name)?;
        let target: syn::Type = syn::parse_str(&self.target_type)
            .map_err(|e| AopError::CodeEmission(format!("invalid target type '{}': {}", self.target_type, e)))?;

        let bodies = self.methods.iter().filter_map(|method| match method {
            ProxyMethod::Intercepted { body, .. } => Some(body.clone()),
            ProxyMethod::Passthrough { .. } => None,
        });

        let tokens = quote! {
            #[allow(non_camel_case_types)]
            pub struct #proxy {
                target: #target,
                weaving: #runtime::Weaving,
            }

            impl #proxy {
                pub fn new(target: #target, weaving: #runtime::Weaving) -> Self {
                    Self { target, weaving }
                }

                pub fn target(&self) -> &#target {
                    &self.target
                }

                fn weaving(&self) -> &#runtime::Weaving {
                    &self.weaving
                }

                #(#bodies)*
            }

            impl ::std::ops::Deref for #proxy {
                type Target = #target;

                fn deref(&self) -> &Self::Target {
                    &self.target
                }
            }
        };

        syn::parse2::<syn::File>(tokens.clone())
            .map_err(|e| AopError::CodeEmission(format!("{}: {}", self.proxy_name, e)))?;

        Ok(tokens)
    }

    /// 生成源码文本
    pub fn render(&self, runtime_path: &str) -> AopResult<String> {
        Ok(self.to_tokens(runtime_path)?.to_string())
    }
}

impl<B> fmt::Debug for CompiledProxy<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProxy")
            .field("proxy_name", &self.proxy_name)
            .field("target_type", &self.target_type)
            .field("methods", &self.methods)
            .finish()
    }
}

/// 代理编译器
pub struct ProxyCompiler<E> {
    inspector: Arc<dyn TypeInspector>,
    emitter: E,
    config: CompilerConfig,
}

impl<E: CodeEmitter> ProxyCompiler<E> {
    pub fn new(inspector: Arc<dyn TypeInspector>, emitter: E) -> Self {
        Self {
            inspector,
            emitter,
            config: CompilerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// 编译代理
    ///
    /// 目标类型无法解析，或某个绑定的方法在类型及其祖先上都找不到时，
    /// 返回 InvalidSourceClass
    pub fn compile(&self, bind: &Arc<Bind>, type_name: &str) -> AopResult<CompiledProxy<E::Body>> {
        let ty = self.inspector.resolve(type_name)?;
        let lineage = self.inspector.lineage(&ty);
        let lineage_names: HashSet<&str> = lineage.iter().map(|t| t.name.as_str()).collect();

        // 绑定到本类型或祖先的方法必须存在
        for identity in bind.all_bound_identities() {
            if !lineage_names.contains(identity.owning_type.as_str()) {
                continue;
            }
            let owner = lineage
                .iter()
                .find(|t| t.name == identity.owning_type)
                .ok_or_else(|| AopError::InvalidSourceClass(identity.owning_type.clone()))?;
            self.inspector.find_declaring(owner, &identity.method)?;
        }

        let proxy_name = self.config.proxy_name(&ty.name);
        let mut weaving = Weaving::new(ty.name.as_str(), Arc::clone(bind));
        let mut methods = Vec::new();

        tracing::debug!("Compiling proxy {} for {}", proxy_name, ty.name);

        for method in self.inspector.all_methods(&ty) {
            if !method.is_public() {
                continue;
            }

            let Some(identity) = self.bound_identity(bind, &ty.name, &method) else {
                if self.config.passthrough_unbound {
                    tracing::trace!("  ├─ passthrough {}", method.name);
                    methods.push(ProxyMethod::Passthrough { descriptor: method });
                }
                continue;
            };

            let declaring = self.inspector.find_declaring(&ty, &method.name)?;
            let template = MethodTemplate::for_method(&declaring);
            let slots = TemplateSlots::from_method(&declaring);
            let body = self.emitter.emit(&declaring, template, &slots)?;

            tracing::debug!(
                "  ├─ {} -> {:?} ({} interceptor(s))",
                declaring.signature(),
                template,
                bind.lookup(&identity).map_or(0, |entry| entry.interceptors.len())
            );

            weaving.insert(declaring.clone(), identity.clone());
            methods.push(ProxyMethod::Intercepted {
                descriptor: declaring,
                identity,
                template,
                slots,
                body,
            });
        }

        tracing::debug!(
            "Compiled proxy {}: {} intercepted, {} passthrough",
            proxy_name,
            weaving.len(),
            methods.len() - weaving.len()
        );

        Ok(CompiledProxy {
            proxy_name,
            target_type: ty.name,
            methods,
            weaving,
        })
    }

    /// 方法的绑定标识：先按目标类型，再按声明类型
    fn bound_identity(&self, bind: &Bind, target_type: &str, method: &MethodDescriptor) -> Option<MethodIdentity> {
        [
            MethodIdentity::new(target_type, method.name.as_str()),
            method.identity(),
        ]
        .into_iter()
        .find(|identity| bind.has_binding(identity))
    }
}
