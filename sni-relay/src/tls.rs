use log::info;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fs::File;
use std::io::BufReader;

use crate::error::ConfigError;

/// 加载服务器证书和私钥，构建 TLS 服务端配置
///
/// 不要求客户端证书，任何 SNI 都返回同一张证书。
pub fn load_server_config(cert_path: &str, key_path: &str) -> Result<rustls::ServerConfig, ConfigError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    info!("已加载 TLS 证书: {}", cert_path);
    Ok(config)
}

fn open(path: &str) -> Result<BufReader<File>, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::CertificateIo {
        path: path.to_string(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// 从 PEM 文件读取证书链
fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ConfigError::CertificateIo {
            path: path.to_string(),
            source,
        })?;

    if certs.is_empty() {
        return Err(ConfigError::Certificate(format!("{} 中没有证书", path)));
    }
    Ok(certs)
}

/// 从 PEM 文件读取第一个私钥
fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>, ConfigError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| ConfigError::CertificateIo {
            path: path.to_string(),
            source,
        })?
        .ok_or_else(|| ConfigError::Certificate(format!("{} 中没有私钥", path)))
}
