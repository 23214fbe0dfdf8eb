//! TLS 终止中继：根据客户端 SNI（格式 `<port>-<host>`）确定目标地址，
//! 直连或经由 SOCKS5 代理连接目标，然后双向转发数据。

pub mod config;
pub mod connector;
pub mod error;
pub mod relay;
pub mod server;
pub mod session;
pub mod socks5;
pub mod target;
pub mod tls;

pub use config::{Args, ProxyEndpoint, RelayConfig, Socks5Auth};
pub use connector::Dialer;
pub use error::{ConfigError, ConnectError, SessionError, Socks5Error};
pub use server::Server;
pub use session::{Session, SessionState};
pub use target::{resolve, TargetAddr};
