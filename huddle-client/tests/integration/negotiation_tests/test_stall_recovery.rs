use huddle_client::{
    LinkEvent, NegotiationConfig, NegotiationState, PeerStatus, Role, TimerKind, TrackKind,
};
use huddle_core::ClientSignal;
use std::time::Duration;

use crate::integration::{init_tracing, peer};
use crate::utils::{MockLinkOptions, NegotiatorHarness};

fn silent_links() -> MockLinkOptions {
    MockLinkOptions {
        auto_media: false,
        ..Default::default()
    }
}

fn config(max_retries: u32, auto_retry: bool) -> NegotiationConfig {
    NegotiationConfig {
        max_retries,
        auto_retry,
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_stall_retries_then_fails() {
    init_tracing();

    let remote = peer(2);
    let mut h = NegotiatorHarness::new(peer(1), config(2, true), silent_links());
    let mut n = h.started(remote, Role::Initiator).await;
    let started = tokio::time::Instant::now();

    let mut fired = Vec::new();
    while n.status() != PeerStatus::Failed {
        fired.push(h.fire_next_timer(&mut n).await);
        if fired.len() == 2 {
            assert_eq!(n.status(), PeerStatus::Stalled);
            assert_eq!(n.retry_count(), 1);
            assert_eq!(n.state(), NegotiationState::HaveLocalOffer);
        }
    }

    let send = TimerKind::SendOffer { attempt: 0 };
    assert_eq!(
        fired,
        vec![send, TimerKind::Stall, send, TimerKind::Stall, send, TimerKind::Stall]
    );
    assert!(started.elapsed() >= Duration::from_secs(36));
    assert_eq!(n.retry_count(), 2);
    assert_eq!(n.state(), NegotiationState::Closed);

    let links = h.factory.links_for(remote).await;
    assert_eq!(links.len(), 3);
    for link in &links {
        assert!(link.is_closed().await);
    }
    let offers = h
        .sent_descriptions()
        .into_iter()
        .filter(|s| matches!(s, ClientSignal::Offer { .. }))
        .count();
    assert_eq!(offers, 3);
}

#[tokio::test(start_paused = true)]
async fn test_media_cancels_stall_for_good() {
    init_tracing();

    let remote = peer(2);
    let mut h = NegotiatorHarness::new(peer(1), config(3, true), MockLinkOptions::default());
    let mut n = h.started(remote, Role::Initiator).await;

    h.fire_next_timer(&mut n).await;
    n.handle_answer("answer:remote:1".into()).await;
    h.deliver_link_events(&mut n).await;
    assert_eq!(n.status(), PeerStatus::Connected);
    assert!(n.media_received());

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(
        h.fired_timers().is_empty(),
        "no stall timer left after media arrived"
    );
    assert_eq!(n.status(), PeerStatus::Connected);
    assert_eq!(n.retry_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_without_auto_retry_stall_keeps_link_until_manual_retry() {
    init_tracing();

    let remote = peer(2);
    let mut h = NegotiatorHarness::new(peer(1), config(3, false), silent_links());
    let mut n = h.started(remote, Role::Initiator).await;

    h.fire_next_timer(&mut n).await;
    assert_eq!(h.fire_next_timer(&mut n).await, TimerKind::Stall);

    assert_eq!(n.status(), PeerStatus::Stalled);
    assert_eq!(n.state(), NegotiationState::HaveLocalOffer);
    assert_eq!(n.retry_count(), 0);
    let first = h.factory.latest(remote).await.unwrap();
    assert!(!first.is_closed().await, "link stays up while stalled");

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(h.fired_timers().is_empty(), "nothing retries on its own");
    assert_eq!(n.status(), PeerStatus::Stalled);
    assert_eq!(h.factory.links_for(remote).await.len(), 1);

    n.retry().await;

    assert!(first.is_closed().await);
    assert_eq!(h.factory.links_for(remote).await.len(), 2);
    assert_eq!(n.state(), NegotiationState::HaveLocalOffer);
    assert_eq!(n.retry_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_media_clears_stalled_pair() {
    init_tracing();

    let remote = peer(2);
    let mut h = NegotiatorHarness::new(peer(1), config(3, false), silent_links());
    let mut n = h.started(remote, Role::Initiator).await;

    h.fire_next_timer(&mut n).await;
    h.fire_next_timer(&mut n).await;
    assert_eq!(n.status(), PeerStatus::Stalled);

    n.handle_link_event(LinkEvent::Track(TrackKind::Video)).await;

    assert_eq!(n.status(), PeerStatus::Connected);
    assert_eq!(h.factory.links_for(remote).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_retry_resets_budget() {
    init_tracing();

    let remote = peer(2);
    let mut h = NegotiatorHarness::new(peer(1), config(1, true), silent_links());
    let mut n = h.started(remote, Role::Initiator).await;

    while n.status() != PeerStatus::Failed {
        h.fire_next_timer(&mut n).await;
    }
    assert_eq!(n.retry_count(), 1);
    h.sent();

    n.retry().await;

    assert_eq!(n.retry_count(), 0);
    assert_eq!(n.state(), NegotiationState::HaveLocalOffer);
    assert_eq!(n.role(), Role::Initiator);
    assert_eq!(n.status(), PeerStatus::Stalled, "still no media");

    assert_eq!(
        h.fire_next_timer(&mut n).await,
        TimerKind::SendOffer { attempt: 0 }
    );
    assert!(matches!(
        h.sent_descriptions().as_slice(),
        [ClientSignal::Offer { .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_offer_revives_failed_pair() {
    init_tracing();

    let remote = peer(2);
    let mut h = NegotiatorHarness::new(peer(1), config(0, true), MockLinkOptions::default());
    let mut n = h.started(remote, Role::Initiator).await;

    h.fire_next_timer(&mut n).await;
    h.fire_next_timer(&mut n).await;
    assert_eq!(n.status(), PeerStatus::Failed);
    h.drain_link_events();
    h.sent();

    n.handle_offer("offer:remote:1".into()).await;

    assert_eq!(n.state(), NegotiationState::Stable);
    assert_eq!(n.role(), Role::Responder);
    assert!(matches!(
        h.sent_descriptions().as_slice(),
        [ClientSignal::Answer { .. }]
    ));

    h.deliver_link_events(&mut n).await;
    assert_eq!(n.status(), PeerStatus::Connected);
}
