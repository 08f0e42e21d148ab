//! 代理运行时
//!
//! [`Weaving`] 是编译产物在运行时使用的分派表：方法名 → (描述符, 绑定标识)。
//! 拦截器列表始终从共享的 [`Bind`] 中借用，不做拷贝。

use super::emitter::CallableBody;
use super::{CompiledProxy, ProxyMethod};
use crate::bind::{Bind, BindingEntry};
use crate::descriptor::{MethodDescriptor, MethodIdentity};
use crate::error::{AopError, AopResult};
use crate::target::AopTarget;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 一个被织入的方法：目标方法描述符 + 借用的绑定条目
#[derive(Debug, Clone, Copy)]
pub struct WovenMethod<'a> {
    pub descriptor: &'a MethodDescriptor,
    pub binding: &'a BindingEntry,
}

/// 织入分派表
#[derive(Clone)]
pub struct Weaving {
    target_type: String,
    bind: Arc<Bind>,
    methods: HashMap<String, (MethodDescriptor, MethodIdentity)>,
}

impl Weaving {
    pub(crate) fn new(target_type: impl Into<String>, bind: Arc<Bind>) -> Self {
        Self {
            target_type: target_type.into(),
            bind,
            methods: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, descriptor: MethodDescriptor, identity: MethodIdentity) {
        self.methods.insert(descriptor.name.clone(), (descriptor, identity));
    }

    /// 查找被织入的方法
    pub fn woven(&self, method: &str) -> AopResult<WovenMethod<'_>> {
        let (descriptor, identity) = self
            .methods
            .get(method)
            .ok_or_else(|| AopError::method_not_found(&self.target_type, method))?;
        let binding = self
            .bind
            .lookup(identity)
            .ok_or_else(|| AopError::method_not_found(&self.target_type, method))?;

        Ok(WovenMethod {
            descriptor,
            binding,
        })
    }

    pub fn bind(&self) -> &Arc<Bind> {
        &self.bind
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for Weaving {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("Weaving")
            .field("target_type", &self.target_type)
            .field("methods", &names)
            .finish()
    }
}

/// 代理对象
///
/// 由 [`CompiledProxy::instantiate`] 创建。被绑定的方法经过调用链，
/// 未绑定的公开方法原样转发给目标。
pub struct ProxyObject {
    proxy_name: String,
    target: Arc<dyn AopTarget>,
    weaving: Weaving,
    methods: HashMap<String, ProxyMethod<CallableBody>>,
}

impl ProxyObject {
    pub(crate) fn new(compiled: CompiledProxy<CallableBody>, target: Arc<dyn AopTarget>) -> Self {
        let CompiledProxy {
            proxy_name,
            weaving,
            methods,
            ..
        } = compiled;

        let methods = methods
            .into_iter()
            .map(|method| (method.descriptor().name.clone(), method))
            .collect();

        Self {
            proxy_name,
            target,
            weaving,
            methods,
        }
    }

    /// 调用代理方法
    pub fn call(&self, method: &str, args: &[Value]) -> AopResult<Value> {
        match self.methods.get(method) {
            Some(ProxyMethod::Intercepted { body, .. }) => {
                let woven = self.weaving.woven(method)?;
                tracing::trace!(
                    "{} -> {} interceptor(s) for {}",
                    self.proxy_name,
                    woven.binding.interceptors.len(),
                    method
                );
                body(self.target.as_ref(), woven, args)
            }
            Some(ProxyMethod::Passthrough { descriptor }) => {
                tracing::trace!("{} -> passthrough {}", self.proxy_name, method);
                self.target.invoke(&descriptor.name, args)
            }
            None => Err(AopError::method_not_found(&self.proxy_name, method)),
        }
    }

    /// 代理是否公开该方法
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// 该方法是否经过拦截
    pub fn is_intercepted(&self, method: &str) -> bool {
        matches!(self.methods.get(method), Some(ProxyMethod::Intercepted { .. }))
    }

    pub fn proxy_name(&self) -> &str {
        &self.proxy_name
    }

    pub fn target(&self) -> &Arc<dyn AopTarget> {
        &self.target
    }
}

impl fmt::Debug for ProxyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("ProxyObject")
            .field("proxy_name", &self.proxy_name)
            .field("target", &self.target.type_name())
            .field("methods", &names)
            .finish()
    }
}
