use std::io;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::env::Settings;

pub mod api;
pub mod client;
pub mod env;
pub mod error;
pub mod gate;
pub mod protocol;
pub mod reconciler;
pub mod replay;
pub mod store;

pub use client::BattleClient;
pub use error::ClientError;

pub struct LoggerManager {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

impl LoggerManager {
    pub fn setup(settings: &Settings) -> Self {
        // 1. 파일 로거 설정
        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            &settings.logging.directory,
            &settings.logging.filename,
        );
        let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(file_appender);

        // 2. 로그 레벨 필터 (환경 변수 우선, 없으면 설정 파일 값)
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

        // 3. 콘솔 레이어. 전투 화면과 섞이지 않도록 stderr 로 보낸다.
        let console_layer = fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .compact();

        // 4. 파일 레이어
        let file_layer = fmt::layer()
            .with_writer(non_blocking_file_writer)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .pretty();

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        tracing::info!(
            "Logger initialized: console and file ({}/{})",
            settings.logging.directory,
            settings.logging.filename
        );

        Self { _guard: guard }
    }
}
