//! Probe engine configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::Endpoint;

/// Top-level configuration file layout
///
/// ```toml
/// [probe]
/// concurrency = 5
/// timeout = 3000
///
/// [[sources]]
/// name = "Tuna"
/// url = "https://pypi.tuna.tsinghua.edu.cn/simple"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedTestConfig {
    /// Probe engine settings
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Mirrors to test, in ranking tie-break order
    #[serde(default = "default_sources")]
    pub sources: Vec<Endpoint>,
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            probe: ProbeConfig::default(),
            sources: default_sources(),
        }
    }
}

impl SpeedTestConfig {
    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.probe.validate()?;
        validate_endpoints(&self.sources)
    }
}

/// Sweep and per-attempt settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Maximum endpoint evaluations in flight
    pub concurrency: usize,
    /// Measured attempts per endpoint (warm-up not included)
    pub retry_count: u32,
    /// Per-attempt timeout
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    /// Issue a discarded warm-up attempt before measuring
    pub warmup: bool,
    /// User-Agent sent with every HEAD request
    pub user_agent: String,
    /// Redirects followed per attempt
    pub max_redirects: usize,
    /// Hourly report buckets kept in the result cache
    pub cache_retention_buckets: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            retry_count: 3,
            timeout: Duration::from_millis(3000),
            warmup: true,
            user_agent: "pip/23.0".into(),
            max_redirects: 10,
            cache_retention_buckets: 24 * 7,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "concurrency",
                reason: "must be at least 1".into(),
            });
        }
        if self.retry_count == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "retry_count",
                reason: "must be at least 1".into(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidSetting {
                field: "timeout",
                reason: "must be greater than 0ms".into(),
            });
        }
        if self.cache_retention_buckets == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "cache_retention_buckets",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Reject empty lists, duplicate names and non-http(s) urls.
pub fn validate_endpoints(endpoints: &[Endpoint]) -> Result<(), ConfigError> {
    if endpoints.is_empty() {
        return Err(ConfigError::EmptyEndpoints);
    }

    let mut seen = HashSet::with_capacity(endpoints.len());
    for ep in endpoints {
        if !seen.insert(ep.name.as_str()) {
            return Err(ConfigError::DuplicateName(ep.name.clone()));
        }

        let valid = !ep.name.trim().is_empty()
            && reqwest::Url::parse(&ep.url)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
                .unwrap_or(false);
        if !valid {
            return Err(ConfigError::InvalidUrl {
                name: ep.name.clone(),
                url: ep.url.clone(),
            });
        }
    }
    Ok(())
}

/// Built-in public PyPI mirrors
pub fn default_sources() -> Vec<Endpoint> {
    [
        ("阿里云 (Aliyun)", "https://mirrors.aliyun.com/pypi/simple"),
        ("清华大学 (Tuna)", "https://pypi.tuna.tsinghua.edu.cn/simple"),
        ("腾讯云 (Tencent)", "https://mirrors.cloud.tencent.com/pypi/simple"),
        ("华为云 (Huawei)", "https://repo.huaweicloud.com/repository/pypi/simple"),
        ("中科大 (USTC)", "https://pypi.mirrors.ustc.edu.cn/simple"),
        ("BH6BHG的无线电源", "https://bc9ce2eff4cc.ngrok-free.app/simple"),
        ("豆瓣 (Douban)", "https://pypi.doubanio.com/simple"),
        ("网易 (163)", "https://mirrors.163.com/pypi/simple"),
        ("百度云 (Baidu)", "https://mirror.baidu.com/pypi/simple"),
        ("官方源 (PyPI)", "https://pypi.org/simple"),
        ("上海交大 (SJTU)", "https://mirror.sjtu.edu.cn/pypi/simple"),
        ("华中科大 (HUST)", "https://pypi.hust.edu.cn/simple"),
        ("北京理工 (BIT)", "https://pypi.bit.edu.cn/simple"),
        ("大连理工 (DUT)", "https://pypi.dut.edu.cn/simple"),
        ("东软信息学院 (Neusoft)", "https://mirrors.neusoft.edu.cn/pypi/simple"),
        ("兰州大学 (LZU)", "https://pypi.lzu.edu.cn/simple"),
        ("西安电子科大 (Xidian)", "https://pypi.xidian.edu.cn/simple"),
        ("南京大学 (NJU)", "https://pypi.nju.edu.cn/simple"),
        ("中国科学院 (CAS)", "https://pypi.mirrors.casct.com/simple"),
        ("浙江大学 (ZJU)", "https://pypi.zju.edu.cn/simple"),
        ("PyPI 德国 (TU Dresden)", "https://pypi.tu-dresden.de/simple"),
    ]
    .into_iter()
    .map(|(name, url)| Endpoint::new(name, url))
    .collect()
}

// Serde helper for Duration (using milliseconds for simplicity)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
