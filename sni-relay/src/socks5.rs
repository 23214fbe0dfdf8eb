use bytes::{BufMut, BytesMut};
use log::debug;
use std::net::IpAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Socks5Auth;
use crate::error::{ConnectError, Socks5Error};

const SOCKS_VERSION: u8 = 0x05;
const NO_AUTHENTICATION: u8 = 0x00;
const USERNAME_PASSWORD: u8 = 0x02;
const NO_ACCEPTABLE_METHODS: u8 = 0xFF;
const AUTH_VERSION: u8 = 0x01;
const AUTH_SUCCESS: u8 = 0x00;
const CONNECT_COMMAND: u8 = 0x01;
const RESERVED: u8 = 0x00;
const REPLY_SUCCEEDED: u8 = 0x00;
const IPV4_ADDRESS: u8 = 0x01;
const DOMAIN_NAME: u8 = 0x03;
const IPV6_ADDRESS: u8 = 0x04;

/// 在已建立的代理连接上完成 SOCKS5 握手并请求连接目标
///
/// 返回后 `stream` 即是到目标的透明隧道。
pub async fn connect<S>(
    stream: &mut S,
    host: &str,
    port: &str,
    auth: Option<&Socks5Auth>,
) -> Result<(), ConnectError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // 先校验目标，避免握手后才发现请求无法编码
    let request = build_connect_request(host, port)?;

    negotiate_method(stream, auth).await?;
    send_connect_request(stream, &request).await?;
    Ok(())
}

async fn negotiate_method<S>(stream: &mut S, auth: Option<&Socks5Auth>) -> Result<(), ConnectError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let greeting: &[u8] = match auth {
        Some(_) => &[SOCKS_VERSION, 2, NO_AUTHENTICATION, USERNAME_PASSWORD],
        None => &[SOCKS_VERSION, 1, NO_AUTHENTICATION],
    };
    stream.write_all(greeting).await?;

    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;

    let version = buf[0];
    let method = buf[1];

    if version != SOCKS_VERSION {
        return Err(Socks5Error::InvalidVersion(version).into());
    }

    match (method, auth) {
        (NO_AUTHENTICATION, _) => {
            debug!("SOCKS5 代理无需认证");
            Ok(())
        }
        (USERNAME_PASSWORD, Some(auth)) => authenticate(stream, auth).await,
        (NO_ACCEPTABLE_METHODS, _) => Err(Socks5Error::NoAcceptableMethods.into()),
        (other, _) => Err(Socks5Error::UnexpectedMethod(other).into()),
    }
}

/// RFC 1929 用户名密码认证
async fn authenticate<S>(stream: &mut S, auth: &Socks5Auth) -> Result<(), ConnectError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let username = auth.username().as_bytes();
    let password = auth.password().as_bytes();
    if username.len() > u8::MAX as usize || password.len() > u8::MAX as usize {
        return Err(Socks5Error::CredentialsTooLong.into());
    }

    let mut request = BytesMut::with_capacity(3 + username.len() + password.len());
    request.put_u8(AUTH_VERSION);
    request.put_u8(username.len() as u8);
    request.put_slice(username);
    request.put_u8(password.len() as u8);
    request.put_slice(password);
    stream.write_all(&request).await?;

    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;

    let status = buf[1];
    if status != AUTH_SUCCESS {
        return Err(Socks5Error::AuthFailed(status).into());
    }

    debug!("SOCKS5 认证成功，用户: {}", auth.username());
    Ok(())
}

fn build_connect_request(host: &str, port: &str) -> Result<BytesMut, Socks5Error> {
    let port: u16 = port
        .parse()
        .map_err(|_| Socks5Error::InvalidPort(port.to_string()))?;

    let mut request = BytesMut::with_capacity(7 + host.len());
    request.put_slice(&[SOCKS_VERSION, CONNECT_COMMAND, RESERVED]);

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            request.put_u8(IPV4_ADDRESS);
            request.put_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            request.put_u8(IPV6_ADDRESS);
            request.put_slice(&ip.octets());
        }
        Err(_) => {
            if host.len() > u8::MAX as usize {
                return Err(Socks5Error::DomainTooLong(host.to_string()));
            }
            request.put_u8(DOMAIN_NAME);
            request.put_u8(host.len() as u8);
            request.put_slice(host.as_bytes());
        }
    }

    request.put_u16(port);
    Ok(request)
}

async fn send_connect_request<S>(stream: &mut S, request: &[u8]) -> Result<(), ConnectError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await?;

    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).await?;

    let version = buf[0];
    let reply = buf[1];
    let address_type = buf[3];

    if version != SOCKS_VERSION {
        return Err(Socks5Error::InvalidVersion(version).into());
    }

    if reply != REPLY_SUCCEEDED {
        return Err(Socks5Error::RequestRejected(reply).into());
    }

    // 读取并丢弃代理绑定的地址和端口
    let addr_len = match address_type {
        IPV4_ADDRESS => 4,
        IPV6_ADDRESS => 16,
        DOMAIN_NAME => {
            let mut len_buf = [0u8; 1];
            stream.read_exact(&mut len_buf).await?;
            len_buf[0] as usize
        }
        other => return Err(Socks5Error::UnsupportedAddressType(other).into()),
    };

    let mut bound = vec![0u8; addr_len + 2];
    stream.read_exact(&mut bound).await?;
    Ok(())
}
