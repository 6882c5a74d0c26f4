mod test_helpers;

use arena_server::create_routes;
use arena_types::{ClientMessage, ServerMessage};
use test_helpers::*;
use warp::test::WsClient;

fn ws_token(name: &str) -> String {
    dev_token(name).trim_start_matches("Bearer ").to_string()
}

async fn send(ws: &mut WsClient, message: &ClientMessage) {
    let json = serde_json::to_string(message).expect("Should serialize");
    ws.send_text(json).await;
}

async fn recv(ws: &mut WsClient) -> ServerMessage {
    let msg = ws.recv().await.expect("Should receive a message");
    let text = msg.to_str().expect("Should be a text frame");
    serde_json::from_str(text).expect("Should be valid ServerMessage")
}

#[tokio::test]
async fn test_invalid_frame_reports_error_and_keeps_connection() {
    let state = setup_state().await;
    let mut ws = warp::test::ws()
        .path("/ws")
        .handshake(create_routes(state))
        .await
        .expect("WebSocket handshake should succeed");

    ws.send_text("invalid json").await;
    match recv(&mut ws).await {
        ServerMessage::Error { message } => assert!(message.contains("Invalid message")),
        other => panic!("Expected Error, got {:?}", other),
    }

    // Still usable afterwards
    send(&mut ws, &ClientMessage::JoinRankedQueue).await;
    match recv(&mut ws).await {
        ServerMessage::Error { message } => assert!(message.contains("Authentication required")),
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bad_token_fails_authentication() {
    let state = setup_state().await;
    let mut ws = warp::test::ws()
        .path("/ws")
        .handshake(create_routes(state))
        .await
        .expect("WebSocket handshake should succeed");

    send(
        &mut ws,
        &ClientMessage::Authenticate {
            token: "garbage".to_string(),
        },
    )
    .await;
    assert!(matches!(
        recv(&mut ws).await,
        ServerMessage::AuthenticationFailed { .. }
    ));
}

#[tokio::test]
async fn test_authenticate_and_join_ranked_queue() {
    let state = setup_state().await;
    create_profile(&state, "alice", 3).await;
    let mut ws = warp::test::ws()
        .path("/ws")
        .handshake(create_routes(state.clone()))
        .await
        .expect("WebSocket handshake should succeed");

    send(
        &mut ws,
        &ClientMessage::Authenticate {
            token: ws_token("alice"),
        },
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::AuthenticationSuccess { profile } => {
            assert_eq!(profile.map(|p| p.id), Some(dev_user_id("alice")));
        }
        other => panic!("Expected AuthenticationSuccess, got {:?}", other),
    }

    send(&mut ws, &ClientMessage::JoinRankedQueue).await;
    match recv(&mut ws).await {
        ServerMessage::QueueJoined { position } => assert_eq!(position, 1),
        other => panic!("Expected QueueJoined, got {:?}", other),
    }
    assert!(state.ranked_queue.is_player_in_queue(dev_user_id("alice")).await);

    send(&mut ws, &ClientMessage::LeaveRankedQueue).await;
    assert!(matches!(recv(&mut ws).await, ServerMessage::QueueLeft));
}

#[tokio::test]
async fn test_two_queued_players_are_matched() {
    let state = setup_state().await;
    create_profile(&state, "alice", 3).await;
    create_profile(&state, "bob", 3).await;
    let app = create_routes(state.clone());

    let mut ws1 = warp::test::ws()
        .path("/ws")
        .handshake(app.clone())
        .await
        .expect("WebSocket handshake should succeed");
    let mut ws2 = warp::test::ws()
        .path("/ws")
        .handshake(app)
        .await
        .expect("WebSocket handshake should succeed");

    for (ws, name) in [(&mut ws1, "alice"), (&mut ws2, "bob")] {
        send(
            ws,
            &ClientMessage::Authenticate {
                token: ws_token(name),
            },
        )
        .await;
        let _auth_response = recv(ws).await;
    }

    send(&mut ws1, &ClientMessage::JoinRankedQueue).await;
    assert!(matches!(
        recv(&mut ws1).await,
        ServerMessage::QueueJoined { .. }
    ));
    send(&mut ws2, &ClientMessage::JoinRankedQueue).await;
    assert!(matches!(
        recv(&mut ws2).await,
        ServerMessage::QueueJoined { .. }
    ));

    // Equal rank points pair on the spot
    let first = match recv(&mut ws1).await {
        ServerMessage::MatchFound { battle } => battle,
        other => panic!("Expected MatchFound, got {:?}", other),
    };
    let second = match recv(&mut ws2).await {
        ServerMessage::MatchFound { battle } => battle,
        other => panic!("Expected MatchFound, got {:?}", other),
    };
    assert_eq!(first.match_id, second.match_id);
    assert_eq!(state.ranked_queue.queue_length().await, 0);
    assert!(state.battles.is_in_battle(dev_user_id("alice")));
}
