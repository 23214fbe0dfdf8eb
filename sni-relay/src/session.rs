use log::{debug, error, info, warn};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::error::SessionError;
use crate::relay;
use crate::target::{self, TargetAddr};

/// 会话所处阶段，任何阶段失败都直接进入 Closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    Handshaking,
    SniExtracted,
    TargetResolved,
    UpstreamConnecting,
    Relaying,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Accepted => "accepted",
            Self::Handshaking => "handshaking",
            Self::SniExtracted => "sni-extracted",
            Self::TargetResolved => "target-resolved",
            Self::UpstreamConnecting => "upstream-connecting",
            Self::Relaying => "relaying",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// 单个客户端连接的完整生命周期
///
/// 握手 → 解析 SNI → 连接目标 → 双向转发 → 关闭。
/// 连接由会话独占，任何退出路径上都会被释放。
pub struct Session {
    id: String,
    peer: SocketAddr,
    config: Arc<RelayConfig>,
    state: SessionState,
    target: Option<TargetAddr>,
}

impl Session {
    pub fn new(peer: SocketAddr, config: Arc<RelayConfig>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            peer,
            config,
            state: SessionState::Accepted,
            target: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 处理连接直到结束，失败原因在这里记录日志
    pub async fn run(mut self, stream: TcpStream) -> Result<(), SessionError> {
        info!("[{}] 连接建立: {}", self.id, self.peer);

        let result = self.process(stream).await;
        let failed_at = self.state;
        self.state = SessionState::Closed;

        match &result {
            Ok(()) => info!("[{}] 连接结束: {}", self.id, self.peer),
            Err(e) => self.log_failure(failed_at, e),
        }
        result
    }

    async fn process(&mut self, stream: TcpStream) -> Result<(), SessionError> {
        self.state = SessionState::Handshaking;
        let tls_stream = self
            .config
            .acceptor
            .accept(stream)
            .await
            .map_err(SessionError::Handshake)?;

        let sni = match tls_stream.get_ref().1.server_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(SessionError::MissingSni),
        };
        self.state = SessionState::SniExtracted;
        debug!("[{}] SNI: {}", self.id, sni);

        let target = target::resolve(&sni)?;
        self.state = SessionState::TargetResolved;
        info!(
            "[{}] 目标主机: {}, 目标端口: {}",
            self.id,
            target.host(),
            target.port()
        );
        self.target = Some(target.clone());

        self.state = SessionState::UpstreamConnecting;
        let upstream = self
            .config
            .dialer
            .connect(&target)
            .await
            .map_err(|source| SessionError::UpstreamConnect {
                target: target.to_string(),
                source,
            })?;
        info!(
            "[{}] 成功连接到目标服务器: {}{}",
            self.id,
            target,
            if self.config.dialer.is_proxied() { " (SOCKS5)" } else { "" }
        );

        self.state = SessionState::Relaying;
        let stats = relay::relay(tls_stream, upstream).await;
        debug!(
            "[{}] 转发完成: 客户端到目标 {:?} 字节, 目标到客户端 {:?} 字节",
            self.id, stats.client_to_target, stats.target_to_client
        );

        match stats.into_error() {
            Some(e) => Err(SessionError::RelayIo(e)),
            None => Ok(()),
        }
    }

    fn log_failure(&self, failed_at: SessionState, err: &SessionError) {
        let target = self
            .target
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());

        match err {
            // 转发阶段的 I/O 错误在连接断开时很常见
            SessionError::RelayIo(_) => debug!(
                "[{}] 连接结束 {} -> {}: {}",
                self.id, self.peer, target, err
            ),
            SessionError::UpstreamConnect { .. } => error!(
                "[{}] {} 阶段失败 {} -> {}: {}",
                self.id, failed_at, self.peer, target, err
            ),
            _ => warn!(
                "[{}] {} 阶段失败 {} -> {}: {}",
                self.id, failed_at, self.peer, target, err
            ),
        }
    }
}
