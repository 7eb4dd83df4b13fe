//! 主应用程序入口
//!
//! 装配实时层服务图并启动 Axum Web API 服务。

use std::sync::Arc;
use std::time::Duration;

use application::{
    ConnectionBroadcaster, ConnectionRegistry, IdentityVerifier, MessageRepository, MessageRouter,
    RealtimeDependencies, RoomPresenceService, RoomRepository,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, ChannelBroadcaster, JwtIdentityVerifier, PgMessageRepository, PgRoomRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 读取环境变量配置
    let app_config = AppConfig::from_env_with_defaults();
    if let Err(err) = app_config.validate() {
        tracing::warn!(error = %err, "configuration failed production validation checks");
    }

    tracing::info!(
        "connecting database: {}",
        app_config.database.url.split('@').last().unwrap_or("unknown")
    );

    // 创建 PostgreSQL 连接池并运行迁移
    let pg_pool = create_pg_pool(&app_config.database.url, app_config.database.max_connections).await?;
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 持久化网关
    let message_repository: Arc<dyn MessageRepository> =
        Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let room_repository: Arc<dyn RoomRepository> = Arc::new(PgRoomRepository::new(pg_pool));

    // 进程级单例：连接登记表和传输广播器，显式创建并按句柄传递
    let registry = Arc::new(ConnectionRegistry::new());
    let transport = Arc::new(ChannelBroadcaster::new());
    let broadcaster: Arc<dyn ConnectionBroadcaster> = transport.clone();

    let repository_timeout = Duration::from_millis(app_config.database.statement_timeout_ms);

    // 实时层服务图
    let presence = Arc::new(RoomPresenceService::new(
        registry.clone(),
        broadcaster.clone(),
    ));
    let message_router = Arc::new(MessageRouter::new(
        registry.clone(),
        message_repository.clone(),
        broadcaster.clone(),
        repository_timeout,
    ));
    let realtime = Arc::new(RealtimeDependencies {
        registry,
        presence,
        router: message_router,
        rooms: room_repository,
        messages: message_repository,
        broadcaster,
        history_limit: app_config.chat.history_limit,
        repository_timeout,
    });

    // 身份网关
    let identity_verifier: Arc<dyn IdentityVerifier> =
        Arc::new(JwtIdentityVerifier::new(&app_config.jwt));

    let state = AppState::new(realtime, identity_verifier, transport);

    // 启动 Web 服务器
    let app = router(state);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("tech4um server listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
