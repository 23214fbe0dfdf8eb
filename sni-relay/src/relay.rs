use log::debug;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const BUFFER_SIZE: usize = 8192;

/// 双向转发结果，两个方向各自独立结束
#[derive(Debug)]
pub struct RelayStats {
    /// 客户端到目标方向转发的字节数
    pub client_to_target: io::Result<u64>,
    /// 目标到客户端方向转发的字节数
    pub target_to_client: io::Result<u64>,
}

impl RelayStats {
    /// 取出第一个出错方向的错误
    pub fn into_error(self) -> Option<io::Error> {
        self.client_to_target.err().or(self.target_to_client.err())
    }
}

/// 在客户端连接和目标连接之间双向转发数据
///
/// 两个方向并发执行，必须都结束（EOF 或出错）后才返回；
/// 一个方向结束时会关闭对端的写入端，另一个方向继续转发。
/// 两个连接在返回前被释放。
pub async fn relay<D, U>(downstream: D, upstream: U) -> RelayStats
where
    D: AsyncRead + AsyncWrite,
    U: AsyncRead + AsyncWrite,
{
    let (mut client_read, mut client_write) = tokio::io::split(downstream);
    let (mut target_read, mut target_write) = tokio::io::split(upstream);

    let client_to_target = forward(&mut client_read, &mut target_write);
    let target_to_client = forward(&mut target_read, &mut client_write);

    // 等待两个方向都完成，不因一方先结束而取消另一方
    let (client_to_target, target_to_client) = tokio::join!(client_to_target, target_to_client);

    RelayStats {
        client_to_target,
        target_to_client,
    }
}

/// 单向复制直到 EOF 或出错，结束时关闭写入端
async fn forward<R, W>(reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = copy(reader, writer).await;

    if let Err(e) = writer.shutdown().await {
        debug!("关闭写入端时出错: {}", e);
    }

    result
}

async fn copy<R, W>(reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        total += n as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{duplex, DuplexStream, ReadBuf};

    /// 读取立即出错、写入正常的连接
    struct BrokenRead(DuplexStream);

    impl AsyncRead for BrokenRead {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    impl AsyncWrite for BrokenRead {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Pin::new(&mut self.0).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.0).poll_flush(cx)
        }

        fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.0).poll_shutdown(cx)
        }
    }

    #[tokio::test]
    async fn test_relay_both_directions() {
        let (client_side, mut client) = duplex(1024);
        let (target_side, mut target) = duplex(1024);

        let relay_task = tokio::spawn(relay(client_side, target_side));

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        target.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        target.write_all(b"pong!").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong!");

        client.shutdown().await.unwrap();
        target.shutdown().await.unwrap();

        let stats = relay_task.await.unwrap();
        assert_eq!(stats.client_to_target.unwrap(), 4);
        assert_eq!(stats.target_to_client.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_half_close_keeps_other_direction() {
        let (client_side, mut client) = duplex(1024);
        let (target_side, mut target) = duplex(1024);

        let relay_task = tokio::spawn(relay(client_side, target_side));

        client.write_all(b"request").await.unwrap();
        client.shutdown().await.unwrap();

        // 目标先看到请求，再看到 EOF
        let mut request = Vec::new();
        target.read_to_end(&mut request).await.unwrap();
        assert_eq!(request, b"request");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!relay_task.is_finished());

        target.write_all(b"response").await.unwrap();
        target.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"response");

        let stats = relay_task.await.unwrap();
        assert_eq!(stats.client_to_target.unwrap(), 7);
        assert_eq!(stats.target_to_client.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_error_on_one_side_waits_for_other() {
        let (client_side, mut client) = duplex(1024);
        let (target_side, mut target) = duplex(1024);

        let relay_task = tokio::spawn(relay(BrokenRead(client_side), target_side));

        // 客户端方向立即出错，目标收到 EOF
        let mut buf = Vec::new();
        target.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!relay_task.is_finished());

        target.write_all(b"late data").await.unwrap();
        let mut late = [0u8; 9];
        client.read_exact(&mut late).await.unwrap();
        assert_eq!(&late, b"late data");

        target.shutdown().await.unwrap();
        let stats = relay_task.await.unwrap();
        assert_eq!(stats.target_to_client.as_ref().unwrap(), &9);
        let err = stats.into_error().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn test_connections_closed_after_relay() {
        let (client_side, mut client) = duplex(1024);
        let (target_side, mut target) = duplex(1024);

        let relay_task = tokio::spawn(relay(client_side, target_side));
        client.shutdown().await.unwrap();
        target.shutdown().await.unwrap();
        relay_task.await.unwrap();

        // 中继端已被释放，对端读到 EOF，写入失败
        let mut buf = Vec::new();
        assert_eq!(client.read_to_end(&mut buf).await.unwrap(), 0);
        assert!(target.write_all(b"x").await.is_err());
    }
}
