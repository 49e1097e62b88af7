use huddle_client::PeerStatus;
use huddle_core::RoomCode;

use crate::integration::{create_test_config, init_tracing, wait_for_members, wait_until};
use crate::utils::{MockLinkOptions, TestClient, TestRelay};

async fn connected_pair(relay: &TestRelay, room: &RoomCode) -> (TestClient, TestClient) {
    let a = relay
        .attach(create_test_config(), MockLinkOptions::default())
        .await;
    a.handle.join(room.clone()).unwrap();
    wait_for_members(&relay.relay, room, &[a.id]).await;

    let b = relay
        .attach(create_test_config(), MockLinkOptions::default())
        .await;
    b.handle.join(room.clone()).unwrap();

    wait_until(&a.handle, "a connected", |s| {
        s.peer_status(&b.id) == Some(PeerStatus::Connected)
    })
    .await;
    wait_until(&b.handle, "b connected", |s| {
        s.peer_status(&a.id) == Some(PeerStatus::Connected)
    })
    .await;
    (a, b)
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_closes_remote_pair() {
    init_tracing();

    let relay = TestRelay::new();
    let room = RoomCode::from("r1");
    let (a, b) = connected_pair(&relay, &room).await;
    let b_id = b.id;

    relay.disconnect(b).await;

    wait_until(&a.handle, "pair with b discarded", |s| !s.peers.contains_key(&b_id)).await;
    assert!(a.factory.latest(b_id).await.unwrap().is_closed().await);
    assert_eq!(relay.relay.registry().members(&room), vec![a.id]);
}

#[tokio::test(start_paused = true)]
async fn test_leave_closes_pairs_on_both_sides() {
    init_tracing();

    let relay = TestRelay::new();
    let room = RoomCode::from("r1");
    let (a, b) = connected_pair(&relay, &room).await;

    a.handle.leave().unwrap();

    let a_status = wait_until(&a.handle, "a has no pairs", |s| s.peers.is_empty()).await;
    assert_eq!(a_status.room, None);
    wait_until(&b.handle, "b has no pairs", |s| s.peers.is_empty()).await;
    wait_for_members(&relay.relay, &room, &[b.id]).await;

    b.handle.leave().unwrap();
    for _ in 0..100 {
        if !relay.relay.registry().contains_room(&room) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    assert!(!relay.relay.registry().contains_room(&room), "empty room is removed");
}
