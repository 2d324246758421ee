use std::sync::Arc;

use anyhow::Result;
use battle_replay::{
    api::HttpBattleApi,
    env::Settings,
    gate::Submission,
    protocol::{StartSessionRequest, RANDOM_CHOICE},
    replay::TaggedClassifier,
    BattleClient, LoggerManager,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "battle replay client",
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,
)]
struct Args {
    /// 내 전투원 이름 (또는 random)
    #[arg(long, default_value = RANDOM_CHOICE)]
    player: String,

    /// 상대 전투원 이름 (기본 random)
    #[arg(long)]
    opponent: Option<String>,

    /// 양쪽 모두 무작위 전투원으로 시작
    #[arg(long, conflicts_with_all = ["player", "opponent"])]
    random: bool,

    /// 이름 검색 결과만 출력하고 종료
    #[arg(long)]
    search: Option<String>,

    /// config/{mode}.toml 을 읽는다
    #[arg(long = "config-mode")]
    config_mode: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 환경변수 로드
    dotenv::dotenv().ok();
    let args = Args::parse();

    // 2. 설정 파일 로드
    let settings = match &args.config_mode {
        Some(mode) => Settings::for_mode(mode)?,
        None => Settings::new()?,
    };

    // 3. 로거 초기화
    let _logger = LoggerManager::setup(&settings);

    let api = Arc::new(HttpBattleApi::new(&settings.server)?);
    let client = Arc::new(
        BattleClient::new(api, &settings).with_classifier(Box::new(TaggedClassifier::default())),
    );

    if let Some(query) = &args.search {
        for suggestion in client.search(query).await? {
            println!("{:<16} {}", suggestion.name, suggestion.sprite);
        }
        return Ok(());
    }

    let request = if args.random {
        StartSessionRequest::random()
    } else {
        StartSessionRequest::new(args.player.clone(), args.opponent.clone())
    };
    if let Err(e) = client.start(request.clone()).await {
        eprintln!("BATTLE ERROR! {}", e.user_message());
        return Ok(());
    }

    let shutdown_token = CancellationToken::new();
    let render_task = tokio::spawn(render_loop(client.clone(), shutdown_token.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!(
        "Press 1-{} + Enter to attack, n for a new battle, q to quit.",
        settings.gate.max_shortcut
    );

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received. Shutting down...");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "q" => break,
            "n" => {
                // 실패하면 진행 중이던 전투가 그대로 남는다.
                let started = tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl+C received. Shutting down...");
                        break;
                    }
                    started = client.start(request.clone()) => started,
                };
                if let Err(e) = started {
                    eprintln!("BATTLE ERROR! {}", e.user_message());
                }
            }
            input => {
                let Some(key) = input.chars().next() else {
                    continue;
                };
                let submitted = tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl+C received. Shutting down...");
                        break;
                    }
                    submitted = client.press_key(key) => submitted,
                };
                match submitted {
                    Ok(Submission::Sent) => {}
                    Ok(Submission::Blocked) => println!("Wait for your turn."),
                    Ok(Submission::AlreadyInFlight) => println!("Move already submitted."),
                    Ok(Submission::UnknownKey) => println!("Unknown key: {}", input),
                    Err(e) => {
                        error!("Move failed: {}", e);
                        eprintln!("BATTLE ERROR! {}", e.user_message());
                    }
                }
            }
        }
    }

    shutdown_token.cancel();
    client.reset();
    let _ = render_task.await;
    Ok(())
}

/// 저장소나 리플레이 상태가 바뀔 때마다 화면을 다시 그린다.
async fn render_loop(client: Arc<BattleClient>, shutdown_token: CancellationToken) {
    let mut store_rx = client.reader();
    let mut replay_rx = client.subscribe_replay();

    loop {
        if let Some(frame) = client.frame() {
            println!("{}", frame);
        }
        tokio::select! {
            _ = shutdown_token.cancelled() => break,
            changed = store_rx.changed() => {
                if !changed {
                    break;
                }
            }
            changed = replay_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}
