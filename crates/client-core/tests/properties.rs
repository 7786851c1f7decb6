//! Property tests for clamping and membership invariants

mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;
use rtcall_client_core::{
    ChannelLedger, EngineCall, LoopbackEngine, RenderPlacement, Session, SessionState,
    clamp_volume,
};

proptest! {
    #[test]
    fn volume_always_forwarded_in_range(volume in any::<i32>()) {
        let engine = LoopbackEngine::new();
        let session = Session::new(Box::new(engine.clone()));
        session
            .initialize("app1", false, Some(common::RecordingSink::new()))
            .unwrap();

        session.set_local_volume(volume).unwrap();
        let forwarded = clamp_volume(volume);
        prop_assert!((0..=400).contains(&forwarded));
        prop_assert_eq!(engine.last_call(), Some(EngineCall::SetLocalVolume(forwarded)));
        if (0..=400).contains(&volume) {
            prop_assert_eq!(forwarded, volume);
        }
    }

    #[test]
    fn placement_alpha_always_clamped(alpha in any::<i32>()) {
        let placement = RenderPlacement::new(0.0, 0.0, 1.0, 1.0, alpha);
        prop_assert_eq!(i32::from(placement.alpha), alpha.clamp(0, 255));
    }

    #[test]
    fn remote_membership_matches_set_model(
        ops in proptest::collection::vec((any::<bool>(), 0u8..8), 0..64)
    ) {
        let ledger = ChannelLedger::new();
        let mut model = BTreeSet::new();

        for (join, user) in ops {
            let user_id = user.to_string();
            if join {
                ledger.on_remote_user_joined(&user_id, None);
                model.insert(user_id);
            } else {
                ledger.on_remote_user_left(&user_id, 0, None);
                model.remove(&user_id);
            }
        }
        prop_assert_eq!(ledger.online_users(), model);
    }

    #[test]
    fn join_then_leave_always_resets(
        channel in "[a-z]{1,12}",
        user_id in "[0-9]{1,6}",
        leave_code in prop_oneof![Just(0), -100i32..0],
        remotes in proptest::collection::vec("[a-z]{1,4}", 0..6),
    ) {
        let engine = LoopbackEngine::new();
        let session = Session::new(Box::new(engine.clone()));
        session
            .initialize("app1", false, Some(common::RecordingSink::new()))
            .unwrap();

        session.join_channel(&channel, &user_id, "").unwrap();
        prop_assert_eq!(session.online_users(), BTreeSet::from([user_id.clone()]));
        for remote in &remotes {
            session.notifier().remote_user_joined(remote);
        }

        engine.fail_next(rtcall_client_core::EngineOp::LeaveChannel, leave_code);
        let _ = session.leave_channel();

        prop_assert_eq!(session.state(), SessionState::Initialized);
        let membership = session.membership();
        prop_assert!(membership.channel_name.is_empty());
        prop_assert!(membership.local_user_id.is_empty());
        prop_assert!(membership.online_users.is_empty());
    }
}
