//! 单个 WebSocket 连接的生命周期。
//!
//! 连接升级后：注册发送端 → 创建会话状态机 → 接收循环分发入站事件，
//! 连接结束时显式走状态机的断开转移，再注销发送端。

use application::{ConnectionBroadcaster, ConnectionSession, UserIdentity};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{ClientEvent, ConnectionId, ErrorCode, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::state::AppState;

pub async fn run(socket: WebSocket, state: AppState, identity: UserIdentity) {
    // 连接标识由传输层分配，与用户身份无关
    let connection_id = ConnectionId::generate();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    state.transport.register(connection_id, tx).await;

    let mut session = ConnectionSession::new(state.realtime.clone(), connection_id, identity);

    let (mut sender, mut incoming) = socket.split();

    // 发送任务：把投递到本连接的事件序列化后写回 WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize websocket payload");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // 接收循环：解析入站事件并交给会话状态机分发
    while let Some(Ok(message)) = incoming.next().await {
        match message {
            WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => session.dispatch(event).await,
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        connection_id = %connection_id,
                        "malformed client event"
                    );
                    let event = ServerEvent::Error {
                        code: ErrorCode::Validation,
                        message: format!("malformed event: {err}"),
                    };
                    if state.transport.deliver(connection_id, event).await.is_err() {
                        break;
                    }
                }
            },
            WsMessage::Close(_) => break,
            // Ping/Pong 由协议栈处理
            _ => {}
        }
    }

    // 断开是显式的状态机转移：清理登记并广播名单；已持久化的消息不回滚
    session.disconnect().await;
    state.transport.unregister(connection_id).await;
    send_task.abort();
}
