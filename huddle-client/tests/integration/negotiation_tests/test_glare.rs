use huddle_client::{NegotiationState, Negotiator, Role, TimerKind};
use huddle_core::ClientSignal;
use std::time::Duration;

use crate::integration::{create_test_config, init_tracing, peer};
use crate::utils::{MockLinkOptions, NegotiatorHarness, offer_sdp};

#[tokio::test(start_paused = true)]
async fn test_lower_id_keeps_its_offer() {
    init_tracing();

    let remote = peer(2);
    let mut h = NegotiatorHarness::new(peer(1), create_test_config(), MockLinkOptions::default());
    let mut n = h.started(remote, Role::Initiator).await;

    n.handle_offer("offer:remote:1".into()).await;

    assert_eq!(n.state(), NegotiationState::HaveLocalOffer);
    assert!(h.sent_descriptions().is_empty(), "the crossing offer is not answered");
    let link = h.factory.latest(remote).await.unwrap();
    assert_eq!(link.answers_created().await, 0);
    assert_eq!(link.rollbacks().await, 0);

    h.fire_next_timer(&mut n).await;
    let sent = h.sent_descriptions();
    assert_eq!(sent.len(), 1);
    assert!(offer_sdp(&sent[0]).is_some(), "own offer still goes out");
}

#[tokio::test(start_paused = true)]
async fn test_higher_id_rolls_back_and_answers() {
    init_tracing();

    let remote = peer(1);
    let mut h = NegotiatorHarness::new(peer(2), create_test_config(), MockLinkOptions::default());
    let mut n = h.started(remote, Role::Initiator).await;

    n.handle_offer("offer:remote:1".into()).await;

    assert_eq!(n.state(), NegotiationState::Stable);
    assert_eq!(n.retry_count(), 0, "rollback is not a recreation");
    let sent = h.sent_descriptions();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], ClientSignal::Answer { to, .. } if *to == remote));

    let link = h.factory.latest(remote).await.unwrap();
    assert_eq!(link.rollbacks().await, 1);
    assert_eq!(link.answers_created().await, 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(
        !h.fired_timers()
            .iter()
            .any(|t| matches!(t.kind, TimerKind::SendOffer { .. })),
        "the rolled back offer is never sent"
    );
}

#[tokio::test(start_paused = true)]
async fn test_glare_resolution_ignores_send_timing() {
    init_tracing();

    // Remote offer lands after our own offer already went out.
    let remote = peer(1);
    let mut h = NegotiatorHarness::new(peer(2), create_test_config(), MockLinkOptions::default());
    let mut n = h.started(remote, Role::Initiator).await;
    h.fire_next_timer(&mut n).await;
    assert_eq!(h.sent_descriptions().len(), 1);

    n.handle_offer("offer:remote:1".into()).await;

    assert_eq!(n.state(), NegotiationState::Stable);
    assert!(matches!(
        h.sent_descriptions().as_slice(),
        [ClientSignal::Answer { .. }]
    ));
}

async fn exchange(
    a: &mut Negotiator,
    ha: &mut NegotiatorHarness,
    b: &mut Negotiator,
    hb: &mut NegotiatorHarness,
    a_hears_first: bool,
) {
    ha.fire_next_timer(a).await;
    hb.fire_next_timer(b).await;
    let a_offer = offer_sdp(&ha.sent_descriptions()[0]).unwrap().to_owned();
    let b_offer = offer_sdp(&hb.sent_descriptions()[0]).unwrap().to_owned();

    if a_hears_first {
        a.handle_offer(b_offer).await;
        b.handle_offer(a_offer).await;
    } else {
        b.handle_offer(a_offer).await;
        a.handle_offer(b_offer).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_exactly_one_side_yields_in_either_delivery_order() {
    init_tracing();

    for a_hears_first in [true, false] {
        let (a_id, b_id) = (peer(10), peer(20));
        let mut ha = NegotiatorHarness::new(a_id, create_test_config(), MockLinkOptions::default());
        let mut hb = NegotiatorHarness::new(b_id, create_test_config(), MockLinkOptions::default());
        let mut a = ha.started(b_id, Role::Initiator).await;
        let mut b = hb.started(a_id, Role::Initiator).await;

        exchange(&mut a, &mut ha, &mut b, &mut hb, a_hears_first).await;

        assert_eq!(a.state(), NegotiationState::HaveLocalOffer);
        assert_eq!(b.state(), NegotiationState::Stable);

        let answers = hb.sent_descriptions();
        assert_eq!(answers.len(), 1);
        let ClientSignal::Answer { to, sdp } = &answers[0] else {
            panic!("expected an answer, got {:?}", answers[0]);
        };
        assert_eq!(*to, a_id);
        assert!(ha.sent_descriptions().is_empty(), "lower id never answers");

        a.handle_answer(sdp.clone()).await;
        assert_eq!(a.state(), NegotiationState::Stable);

        let a_link = ha.factory.latest(b_id).await.unwrap();
        let b_link = hb.factory.latest(a_id).await.unwrap();
        assert_eq!(a_link.answers_created().await, 0);
        assert_eq!(b_link.answers_created().await, 1);
        assert_eq!(b_link.rollbacks().await, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_rollback_unsupported_recreates_as_responder() {
    init_tracing();

    let remote = peer(1);
    let options = MockLinkOptions {
        rollback_supported: false,
        ..Default::default()
    };
    let mut h = NegotiatorHarness::new(peer(2), create_test_config(), options);
    let mut n = h.started(remote, Role::Initiator).await;
    let first_generation = n.generation();

    n.handle_offer("offer:remote:1".into()).await;

    assert_eq!(n.state(), NegotiationState::Stable);
    assert_eq!(n.role(), Role::Responder);
    assert_eq!(n.retry_count(), 1);
    assert!(n.generation() > first_generation);

    let links = h.factory.links_for(remote).await;
    assert_eq!(links.len(), 2);
    assert!(links[0].is_closed().await);
    assert_eq!(links[1].answers_created().await, 1);
    assert!(matches!(
        h.sent_descriptions().as_slice(),
        [ClientSignal::Answer { .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_queued_send_timer_of_rolled_back_offer_is_dropped() {
    init_tracing();

    let remote = peer(1);
    let mut h = NegotiatorHarness::new(peer(2), create_test_config(), MockLinkOptions::default());
    let mut n = h.started(remote, Role::Initiator).await;
    h.fire_next_timer(&mut n).await;
    n.handle_answer("answer:remote:1".into()).await;
    assert_eq!(n.state(), NegotiationState::Stable);
    h.sent();

    n.handle_link_event(huddle_client::LinkEvent::RenegotiationNeeded)
        .await;
    // The send timer fires; its event waits in the queue.
    tokio::time::sleep(Duration::from_millis(60)).await;

    n.handle_offer("offer:remote:2".into()).await;
    assert_eq!(n.state(), NegotiationState::Stable);

    n.handle_link_event(huddle_client::LinkEvent::RenegotiationNeeded)
        .await;
    assert_eq!(n.state(), NegotiationState::HaveLocalOffer);

    h.deliver_timers(&mut n).await;
    assert_eq!(
        h.fire_next_timer(&mut n).await,
        TimerKind::SendOffer { attempt: 0 }
    );
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.deliver_timers(&mut n).await;

    let offers: Vec<_> = h
        .sent_descriptions()
        .iter()
        .filter_map(|s| offer_sdp(s).map(str::to_owned))
        .collect();
    assert_eq!(offers.len(), 1, "one send per local offer: {:?}", offers);
}

#[tokio::test(start_paused = true)]
async fn test_glare_needs_only_local_rollback() {
    init_tracing();

    let remote = peer(1);
    let options = MockLinkOptions {
        local_rollback_only: true,
        ..Default::default()
    };
    let mut h = NegotiatorHarness::new(peer(2), create_test_config(), options);
    let mut n = h.started(remote, Role::Initiator).await;
    let generation = n.generation();

    n.handle_offer("offer:remote:1".into()).await;

    assert_eq!(n.state(), NegotiationState::Stable);
    assert_eq!(n.generation(), generation, "no recreation needed");
    assert_eq!(h.factory.links_for(remote).await.len(), 1);
    assert!(matches!(
        h.sent_descriptions().as_slice(),
        [ClientSignal::Answer { .. }]
    ));
}
