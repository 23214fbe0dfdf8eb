use log::debug;
use tokio::net::TcpStream;

use crate::config::ProxyEndpoint;
use crate::error::ConnectError;
use crate::socks5;
use crate::target::TargetAddr;

/// 上游拨号方式，启动时根据是否配置了代理确定一次
#[derive(Debug, Clone)]
pub enum Dialer {
    /// 直接 TCP 连接目标
    Direct,
    /// 经由 SOCKS5 代理连接目标
    Socks5(ProxyEndpoint),
}

impl Dialer {
    pub fn socks5(endpoint: ProxyEndpoint) -> Self {
        Self::Socks5(endpoint)
    }

    pub fn is_proxied(&self) -> bool {
        matches!(self, Self::Socks5(_))
    }

    /// 建立到目标的连接
    pub async fn connect(&self, target: &TargetAddr) -> Result<TcpStream, ConnectError> {
        match self {
            Self::Direct => {
                let stream = TcpStream::connect(target.to_string()).await?;
                debug!("已直连目标: {}", target);
                Ok(stream)
            }
            Self::Socks5(endpoint) => {
                let mut stream = TcpStream::connect(&endpoint.addr).await?;
                socks5::connect(
                    &mut stream,
                    target.host(),
                    target.port(),
                    endpoint.auth.as_ref(),
                )
                .await?;
                debug!("已通过 SOCKS5 代理 {} 连接目标: {}", endpoint.addr, target);
                Ok(stream)
            }
        }
    }
}
