//! 方法描述符（MethodDescriptor）定义
//!
//! 描述一个方法的结构信息：所属类型、名称、参数、返回值种类和注解。
//! 描述符由类型检查器产生，之后不再修改。

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 方法标识
///
/// (所属类型, 方法名) 二元组，用作绑定的键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodIdentity {
    /// 所属类型名称
    pub owning_type: String,

    /// 方法名称
    pub method: String,
}

impl MethodIdentity {
    pub fn new(owning_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            owning_type: owning_type.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owning_type, self.method)
    }
}

/// 返回值种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// 无返回值
    Void,
    /// 有返回值
    Value,
}

/// 可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// 方法参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// 参数名称
    pub name: String,

    /// 声明类型（源码形式，例如 `u32`、`Vec<String>`）
    pub ty: String,

    /// 参数位置，仅用于排序，不要求从 0 开始连续编号
    pub position: usize,
}

/// 注解
///
/// 附着在方法上的不透明标签，核心不解释其内容，
/// 拦截器可以按具体类型取回
#[derive(Clone)]
pub struct Annotation {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Annotation {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// 注解的类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 注解值的 TypeId
    pub fn type_id(&self) -> TypeId {
        (*self.value).type_id()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// 尝试按具体类型获取注解
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.type_name)
    }
}

/// 方法描述符
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    /// 所属类型名称
    pub owning_type: String,

    /// 方法名称
    pub name: String,

    /// 有序参数列表
    pub parameters: Vec<Parameter>,

    /// 返回值种类
    pub return_kind: ReturnKind,

    /// 可见性
    pub visibility: Visibility,

    /// 注解
    pub annotations: Vec<Annotation>,
}

impl MethodDescriptor {
    /// 创建公开、有返回值、无参数的方法描述符
    pub fn new(owning_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owning_type: owning_type.into(),
            name: name.into(),
            parameters: Vec::new(),
            return_kind: ReturnKind::Value,
            visibility: Visibility::Public,
            annotations: Vec::new(),
        }
    }

    /// 追加一个参数，位置按追加顺序分配
    pub fn param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        let position = self.parameters.len();
        self.parameters.push(Parameter {
            name: name.into(),
            ty: ty.into(),
            position,
        });
        self
    }

    pub fn returns_void(mut self) -> Self {
        self.return_kind = ReturnKind::Void;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// 方法标识
    pub fn identity(&self) -> MethodIdentity {
        MethodIdentity::new(self.owning_type.as_str(), self.name.as_str())
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn is_void(&self) -> bool {
        self.return_kind == ReturnKind::Void
    }

    /// 获取完整的方法签名
    pub fn signature(&self) -> String {
        let params: Vec<_> = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        format!("{}::{}({})", self.owning_type, self.name, params.join(", "))
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// 类型描述符
///
/// 只包含该类型自身声明的方法，继承来的方法通过祖先链查找
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// 类型名称
    pub name: String,

    /// 父类型名称
    pub parent: Option<String>,

    /// 声明的方法
    pub methods: Vec<MethodDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// 声明一个方法，所属类型统一改写为本类型
    pub fn method(mut self, mut method: MethodDescriptor) -> Self {
        method.owning_type = self.name.clone();
        self.methods.push(method);
        self
    }

    /// 查找本类型声明的方法
    pub fn declared(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn test_descriptor_builder() {
        let method = MethodDescriptor::new("MockMethod", "get_sub")
            .param("a", "i64")
            .param("b", "i64");

        assert_eq!(method.parameters[1].position, 1);
        assert_eq!(method.identity(), MethodIdentity::new("MockMethod", "get_sub"));
        assert_eq!(method.signature(), "MockMethod::get_sub(a: i64, b: i64)");
        assert!(method.is_public());
        assert!(!method.is_void());
    }

    #[test]
    fn test_type_descriptor_owns_methods() {
        let ty = TypeDescriptor::new("Child")
            .extends("Parent")
            .method(MethodDescriptor::new("Elsewhere", "run").returns_void());

        let run = ty.declared("run").unwrap();
        assert_eq!(run.owning_type, "Child");
        assert!(run.is_void());
        assert!(ty.declared("missing").is_none());
    }

    #[test]
    fn test_annotation_downcast() {
        let annotation = Annotation::new(Marker);
        assert!(annotation.is::<Marker>());
        assert!(annotation.downcast_ref::<Marker>().is_some());
        assert!(annotation.downcast_ref::<String>().is_none());
        assert_eq!(annotation.type_id(), TypeId::of::<Marker>());
    }
}
