//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `KEEPER__*` 覆盖（双下划线表示嵌套，
//! 如 `KEEPER__LLM__PROVIDER=openai`、`KEEPER__SERVANT__TIMEOUT_SECS=60`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::harness::TestCase;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub servant: ServantSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub harness: HarnessSection,
}

/// [servant] 段：子进程契约（解释器、源码路径、围栏语言、超时）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServantSection {
    /// 启动 servant 的解释器（argv[0]）
    pub interpreter: String,
    /// servant 源码路径；也是 CodeStore 的主路径，备份在同名 .bak
    pub source_path: PathBuf,
    /// new_code 中围栏代码块的语言标注（```python）；随 servant 语言切换
    pub language: String,
    /// 单次运行超时（秒）
    pub timeout_secs: u64,
}

impl Default for ServantSection {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            source_path: PathBuf::from("servant/servant.py"),
            language: "python".to_string(),
            timeout_secs: 30,
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    /// 后端：deepseek / openai；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub deepseek: LlmDeepSeekSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

fn default_request_timeout() -> u64 {
    120
}

/// [harness] 段：测试用例列表；未配置时使用内置默认用例
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HarnessSection {
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            servant: ServantSection::default(),
            llm: LlmSection::default(),
            harness: HarnessSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 KEEPER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 KEEPER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("KEEPER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
