use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
struct Config {
    application: Application,
    network: Network,
    live: Live,
    speech: Speech,
    audio: Audio,
    log: Log,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Network {
    ws_url: String,
    speech_url: String,
    api_key_env: String,
}

#[derive(Deserialize)]
struct Live {
    model: String,
    voice: String,
    input_sample_rate: u32,
    output_sample_rate: u32,
    block_size: usize,
    send_queue_depth: usize,
    event_queue_depth: usize,
}

#[derive(Deserialize)]
struct Speech {
    model: String,
    voice: String,
}

#[derive(Deserialize)]
struct Audio {
    capture_device: String,
    playback_device: String,
    playback_period_size: usize,
}

#[derive(Deserialize)]
struct Log {
    level: String,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 网络配置
    println!("cargo:rustc-env=WS_URL={}", config.network.ws_url);
    println!("cargo:rustc-env=SPEECH_URL={}", config.network.speech_url);
    println!("cargo:rustc-env=API_KEY_ENV={}", config.network.api_key_env);

    // Live 会话配置
    println!("cargo:rustc-env=LIVE_MODEL={}", config.live.model);
    println!("cargo:rustc-env=LIVE_VOICE={}", config.live.voice);
    println!("cargo:rustc-env=INPUT_SAMPLE_RATE={}", config.live.input_sample_rate);
    println!("cargo:rustc-env=OUTPUT_SAMPLE_RATE={}", config.live.output_sample_rate);
    println!("cargo:rustc-env=BLOCK_SIZE={}", config.live.block_size);
    println!("cargo:rustc-env=SEND_QUEUE_DEPTH={}", config.live.send_queue_depth);
    println!("cargo:rustc-env=EVENT_QUEUE_DEPTH={}", config.live.event_queue_depth);

    // TTS 配置
    println!("cargo:rustc-env=SPEECH_MODEL={}", config.speech.model);
    println!("cargo:rustc-env=SPEECH_VOICE={}", config.speech.voice);

    // 音频设备配置
    println!("cargo:rustc-env=CAPTURE_DEVICE={}", config.audio.capture_device);
    println!("cargo:rustc-env=PLAYBACK_DEVICE={}", config.audio.playback_device);
    println!("cargo:rustc-env=PLAYBACK_PERIOD_SIZE={}", config.audio.playback_period_size);

    println!("cargo:rustc-env=LOG_LEVEL={}", config.log.level);
}
