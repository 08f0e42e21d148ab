//! 代理编译配置
//!
//! 支持从 TOML 加载，例如：
//!
//! ```toml
//! [compiler]
//! proxy_suffix = "_Aop"
//! runtime_path = "::loom_aop"
//! passthrough_unbound = true
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```

use crate::logging::LoggingConfig;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 代理编译配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// 代理类型名后缀（默认：`_Proxy`）
    pub proxy_suffix: String,

    /// 生成源码中引用运行时 crate 的路径（默认：`::loom_aop`）
    pub runtime_path: String,

    /// 未绑定的公开方法是否作为透传成员加入代理（默认：true）
    pub passthrough_unbound: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            proxy_suffix: "_Proxy".to_string(),
            runtime_path: "::loom_aop".to_string(),
            passthrough_unbound: true,
        }
    }
}

/// 配置文件
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoomConfig {
    pub compiler: CompilerConfig,
    pub logging: LoggingConfig,
}

impl LoomConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxy_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.proxy_suffix = suffix.into();
        self
    }

    pub fn runtime_path(mut self, path: impl Into<String>) -> Self {
        self.runtime_path = path.into();
        self
    }

    pub fn passthrough_unbound(mut self, enabled: bool) -> Self {
        self.passthrough_unbound = enabled;
        self
    }

    /// 从 TOML 文本解析，读取 `[compiler]` 段
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(LoomConfig::from_toml_str(content)?.compiler)
    }

    /// 从 TOML 文件加载 `[compiler]` 段
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(LoomConfig::from_file(path)?.compiler)
    }

    /// 根据目标类型名生成代理类型名
    pub fn proxy_name(&self, target_type: &str) -> String {
        format!("{}{}", target_type, self.proxy_suffix)
    }
}
