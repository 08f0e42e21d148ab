//! 错误类型定义
//!
//! 织入引擎在检测点同步抛出错误，并原样沿调用链传播。
//! 拦截器可以捕获 `proceed()` 的错误并转换成自己的领域错误。

use thiserror::Error;

/// AOP 错误
#[derive(Debug, Error)]
pub enum AopError {
    /// 目标类型无法解析，或绑定的方法在类型及其祖先上都不存在
    #[error("Invalid source class: {0}")]
    InvalidSourceClass(String),

    /// 调用了目标上不存在的方法
    #[error("Method not found: {type_name}::{method}")]
    MethodNotFound { type_name: String, method: String },

    /// 方法描述符中存在重名参数
    #[error("Duplicate parameter name '{name}' in method '{method}'")]
    DuplicateParameterName { method: String, name: String },

    /// 通过代理读取不存在的属性
    #[error("Undefined property: {type_name}::${property}")]
    UndefinedProperty { type_name: String, property: String },

    /// 目标不支持该能力（例如下标访问）
    #[error("Capability not supported: {0}")]
    CapabilityNotSupported(String),

    /// 实参个数与描述符不符
    #[error("Method '{method}' expects {expected} argument(s), got {actual}")]
    ArgumentCountMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    /// 实参无法转换为参数声明的类型
    #[error("Invalid argument '{parameter}' for method '{method}': {reason}")]
    InvalidArgument {
        method: String,
        parameter: String,
        reason: String,
    },

    /// 代码生成失败
    #[error("Code emission failed: {0}")]
    CodeEmission(String),

    /// 返回值无法转换为动态值
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 拦截器或目标方法抛出的领域错误
    #[error(transparent)]
    Other(anyhow::Error),
}

impl AopError {
    pub fn method_not_found(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            type_name: type_name.into(),
            method: method.into(),
        }
    }

    pub fn invalid_argument(
        method: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidArgument {
            method: method.into(),
            parameter: parameter.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<anyhow::Error> for AopError {
    /// 被包进 anyhow 的 AopError 会还原成原来的变体
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<AopError>() {
            Ok(inner) => inner,
            Err(other) => AopError::Other(other),
        }
    }
}

/// AOP 结果类型
pub type AopResult<T> = Result<T, AopError>;
