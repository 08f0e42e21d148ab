//! 织入目标（AopTarget）
//!
//! 代理通过这个 trait 以动态方式调用真实对象：按方法名分派、
//! 读写属性以及可选的下标访问能力。`#[aop_target]` 宏会为
//! 普通的 impl 块自动生成实现。

use crate::error::{AopError, AopResult};
use serde_json::Value;

/// 织入目标 Trait
pub trait AopTarget: Send + Sync {
    /// 目标类型名称
    fn type_name(&self) -> &str;

    /// 目标是否存在该方法
    fn responds_to(&self, method: &str) -> bool;

    /// 以位置参数调用方法，无返回值的方法返回 `Value::Null`
    fn invoke(&self, method: &str, args: &[Value]) -> AopResult<Value>;

    /// 读取属性
    fn get_property(&self, _name: &str) -> Option<Value> {
        None
    }

    /// 写入属性
    fn set_property(&self, name: &str, _value: Value) -> AopResult<()> {
        Err(AopError::UndefinedProperty {
            type_name: self.type_name().to_string(),
            property: name.to_string(),
        })
    }

    /// 下标访问能力（可选）
    fn as_indexable(&self) -> Option<&dyn Indexable> {
        None
    }

    /// 字符串形式
    fn display(&self) -> String {
        self.type_name().to_string()
    }
}

/// 下标访问能力
pub trait Indexable: Send + Sync {
    fn offset_exists(&self, offset: &Value) -> bool;

    fn offset_get(&self, offset: &Value) -> Option<Value>;

    fn offset_set(&self, offset: Value, value: Value);

    fn offset_unset(&self, offset: &Value);
}
