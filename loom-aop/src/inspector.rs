//! 类型检查器（TypeInspector）
//!
//! 负责按类型名解析类型描述符以及沿祖先链查找方法。
//! 祖先链查找是显式循环，不依赖任何继承式分派。

use crate::descriptor::{MethodDescriptor, TypeDescriptor};
use crate::error::{AopError, AopResult};
use std::collections::{HashMap, HashSet};

/// 类型检查器 Trait
pub trait TypeInspector: Send + Sync {
    /// 解析类型描述符
    fn describe(&self, type_name: &str) -> Option<TypeDescriptor>;

    /// 获取父类型描述符
    fn ancestor_of(&self, ty: &TypeDescriptor) -> Option<TypeDescriptor> {
        ty.parent.as_deref().and_then(|parent| self.describe(parent))
    }

    /// 解析类型，找不到时返回 InvalidSourceClass
    fn resolve(&self, type_name: &str) -> AopResult<TypeDescriptor> {
        self.describe(type_name)
            .ok_or_else(|| AopError::InvalidSourceClass(type_name.to_string()))
    }

    /// 类型自身及全部祖先，从自身开始
    fn lineage(&self, ty: &TypeDescriptor) -> Vec<TypeDescriptor> {
        let mut chain = vec![ty.clone()];
        let mut seen: HashSet<String> = HashSet::from([ty.name.clone()]);
        let mut current = ty.clone();
        while let Some(parent) = self.ancestor_of(&current) {
            // 防止循环继承导致死循环
            if !seen.insert(parent.name.clone()) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// 类型的全部方法（含继承），自身声明在前，子类覆盖父类的同名方法
    fn all_methods(&self, ty: &TypeDescriptor) -> Vec<MethodDescriptor> {
        let mut names = HashSet::new();
        let mut methods = Vec::new();
        for declaring in self.lineage(ty) {
            for method in declaring.methods {
                if names.insert(method.name.clone()) {
                    methods.push(method);
                }
            }
        }
        methods
    }

    /// 沿祖先链查找方法的声明位置
    fn find_declaring(&self, ty: &TypeDescriptor, method: &str) -> AopResult<MethodDescriptor> {
        for declaring in self.lineage(ty) {
            if let Some(found) = declaring.declared(method) {
                return Ok(found.clone());
            }
        }

        Err(AopError::InvalidSourceClass(format!(
            "{} (method '{}' not found on the type or any ancestor)",
            ty.name, method
        )))
    }
}

/// 内存中的类型注册表
///
/// 最简单的 TypeInspector 实现，`#[aop_target]` 生成的 `type_descriptor()`
/// 可以直接注册进来
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册类型描述符，同名覆盖
    pub fn register(&mut self, ty: TypeDescriptor) {
        tracing::debug!("Registering type descriptor: {} ({} methods)", ty.name, ty.methods.len());
        self.types.insert(ty.name.clone(), ty);
    }

    pub fn with(mut self, ty: TypeDescriptor) -> Self {
        self.register(ty);
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeInspector for TypeRegistry {
    fn describe(&self, type_name: &str) -> Option<TypeDescriptor> {
        self.types.get(type_name).cloned()
    }
}
