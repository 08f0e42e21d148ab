//! 命名参数（NamedArgs）
//!
//! 把位置参数按描述符的参数名映射成 名称 → 值。

use crate::descriptor::MethodDescriptor;
use crate::error::{AopError, AopResult};
use crate::invocation::MethodInvocation;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// 命名参数绑定器
pub struct NamedArgs;

impl NamedArgs {
    /// 按参数名绑定位置参数
    ///
    /// 实参少于形参时只返回已提供的部分；描述符中存在重名参数时
    /// 无论实参如何都返回 DuplicateParameterName。每次调用都重新检查。
    pub fn bind(method: &MethodDescriptor, args: &[Value]) -> AopResult<Map<String, Value>> {
        let mut seen = HashSet::new();
        for parameter in &method.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(AopError::DuplicateParameterName {
                    method: method.name.clone(),
                    name: parameter.name.clone(),
                });
            }
        }

        Ok(method
            .parameters
            .iter()
            .zip(args)
            .map(|(parameter, value)| (parameter.name.clone(), value.clone()))
            .collect())
    }

    /// 从调用链获取命名参数
    pub fn get(invocation: &MethodInvocation<'_>) -> AopResult<Map<String, Value>> {
        Self::bind(invocation.method(), invocation.arguments())
    }
}
