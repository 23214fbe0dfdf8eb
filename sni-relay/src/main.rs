use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{error, info};
use sni_relay::{Args, Dialer, RelayConfig, Server};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // 检查必需参数
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        let _ = Args::command().print_help();
        std::process::exit(1);
    }

    // 加载证书并解析代理
    let config = match RelayConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("加载配置失败: {}", e);
            return Err(e.into());
        }
    };
    match &config.dialer {
        Dialer::Socks5(endpoint) => info!("上游经由 SOCKS5 代理: {}", endpoint.addr),
        Dialer::Direct => info!("上游直连目标"),
    }

    let server = Server::bind(Arc::new(config))
        .await
        .with_context(|| format!("监听 {} 失败", args.address))?;

    server.run().await;
    Ok(())
}
