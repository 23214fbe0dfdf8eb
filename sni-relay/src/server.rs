use log::{debug, error, info};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::session::Session;

/// 监听端口并为每个连接启动独立会话
pub struct Server {
    listener: TcpListener,
    config: Arc<RelayConfig>,
}

impl Server {
    pub async fn bind(config: Arc<RelayConfig>) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.address).await?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 持续接受连接，单个连接或 accept 出错都不会停止服务
    pub async fn run(self) {
        if let Ok(addr) = self.local_addr() {
            info!("服务器启动在 {}", addr);
        }

        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    let session = Session::new(addr, self.config.clone());
                    debug!("新连接来自: {}，会话 ID: {}", addr, session.id());

                    tokio::spawn(async move {
                        // 失败原因已在会话内记录
                        let _ = session.run(socket).await;
                    });
                }
                Err(e) => {
                    error!("接受连接时出错: {}", e);
                }
            }
        }
    }
}
