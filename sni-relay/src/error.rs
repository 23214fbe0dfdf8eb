use std::io;

use thiserror::Error;

/// 会话级错误，只影响单个客户端连接
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("TLS 握手失败: {0}")]
    Handshake(#[source] io::Error),

    #[error("客户端未提供 SNI")]
    MissingSni,

    #[error("无法将 SNI 拆分为端口和主机: {0:?}")]
    MalformedSni(String),

    #[error("连接目标 {target} 失败: {source}")]
    UpstreamConnect {
        target: String,
        #[source]
        source: ConnectError,
    },

    #[error("数据转发出错: {0}")]
    RelayIo(#[source] io::Error),
}

/// 上游连接错误
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("SOCKS5 代理错误: {0}")]
    Socks5(#[from] Socks5Error),
}

/// SOCKS5 客户端握手错误
#[derive(Debug, Error)]
pub enum Socks5Error {
    #[error("不支持的 SOCKS 版本: 0x{0:02x}")]
    InvalidVersion(u8),

    #[error("代理不接受任何提供的认证方法")]
    NoAcceptableMethods,

    #[error("代理选择了未提供的认证方法: 0x{0:02x}")]
    UnexpectedMethod(u8),

    #[error("用户名密码认证失败，状态码: 0x{0:02x}")]
    AuthFailed(u8),

    #[error("用户名或密码超过 255 字节")]
    CredentialsTooLong,

    #[error("无效的目标端口: {0:?}")]
    InvalidPort(String),

    #[error("目标域名超过 255 字节: {0}")]
    DomainTooLong(String),

    #[error("代理拒绝连接请求: {}", reply_message(*.0))]
    RequestRejected(u8),

    #[error("不支持的地址类型: 0x{0:02x}")]
    UnsupportedAddressType(u8),
}

/// RFC 1928 应答码说明
fn reply_message(code: u8) -> &'static str {
    match code {
        0x01 => "general SOCKS server failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown error",
    }
}

/// 启动配置错误，出现时进程退出
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("缺少 --{0} 参数")]
    MissingArgument(&'static str),

    #[error("无效的代理地址 {url:?}: {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("读取证书文件失败 {path}: {source}")]
    CertificateIo {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Certificate(String),

    #[error("TLS 配置错误: {0}")]
    Tls(#[from] rustls::Error),
}
