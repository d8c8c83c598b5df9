mod audio;
mod channel;
mod config;
mod controller;
mod error;
mod net_link;
mod protocol;
mod speech;
mod state_machine;
#[cfg(test)]
mod test_utils;

use config::Config;
use controller::LiveController;
use net_link::GeminiChannel;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    let config = Config::new().map_err(anyhow::Error::msg)?;

    // 初始化日志，同时接管 log 宏的输出
    tracing_subscriber::fmt()
        .with_max_level(config.max_log_level())
        .init();

    let backend = audio::default_backend(&config)?;
    let channel = GeminiChannel::new(config.clone());
    let mut controller = LiveController::new(config, backend, Box::new(channel));

    // 带参数：一次性语音合成并播放
    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !text.trim().is_empty() {
        let frame = controller.speak(&text).await?;
        tokio::select! {
            _ = controller.wait_for_speech(&frame) => {}
            _ = signal::ctrl_c() => println!("Received Ctrl+C, shutting down..."),
        }
        return Ok(());
    }

    // 无参数：进入实时语音模式
    let started = tokio::select! {
        result = controller.start() => result,
        _ = signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down...");
            controller.stop();
            return Ok(());
        }
    };
    if let Err(e) = started {
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }
    println!("Live mode started. Press Ctrl+C to stop.");

    tokio::select! {
        _ = controller.run() => println!("Live session ended"),
        _ = signal::ctrl_c() => println!("Received Ctrl+C, shutting down..."),
    }
    controller.stop();
    Ok(())
}
