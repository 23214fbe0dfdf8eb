use std::fmt;

use crate::error::SessionError;

/// SNI 中端口与主机之间的分隔符
const SNI_SEPARATOR: char = '-';

/// 从 SNI 解析出的目标地址
///
/// SNI 格式为 `<port>-<host>`，只按第一个 `-` 拆分，
/// 所以主机名中的 `-` 会原样保留。端口和主机不做校验，
/// 非法取值会在拨号时自然失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddr {
    host: String,
    port: String,
}

impl TargetAddr {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// 把 SNI 解析为目标地址
pub fn resolve(sni: &str) -> Result<TargetAddr, SessionError> {
    match sni.split_once(SNI_SEPARATOR) {
        Some((port, host)) if !port.is_empty() && !host.is_empty() => Ok(TargetAddr {
            host: host.to_string(),
            port: port.to_string(),
        }),
        _ => Err(SessionError::MalformedSni(sni.to_string())),
    }
}
