//! Transport-level behavior of the channel group: broadcast fidelity,
//! rank-ordered gather, tag discipline, liveness, and teardown.

use rankwise::channel::{self, ChannelGroup};
use rankwise::{CommGroup, Error, TransportError};
use std::thread;
use std::time::Duration;

#[test]
fn broadcast_is_bit_identical_on_every_rank() {
    let original = vec![0.1f64, -2.5, 3.5e300, f64::MIN_POSITIVE];
    let expected = original.clone();
    let copies = channel::run_on_threads(5, move |group| {
        if group.rank() == 0 {
            group.bcast(&original).map(|()| original.clone())
        } else {
            group.recv_bcast::<Vec<f64>>(0)
        }
    })
    .unwrap();

    for copy in copies {
        let copy = copy.unwrap();
        assert_eq!(copy.len(), expected.len());
        for (a, b) in copy.iter().zip(&expected) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}

#[test]
fn scatter_compute_gather_round_trip() {
    let size = 4u32;
    let results = channel::run_on_threads(size, move |group| {
        if group.rank() == 0 {
            let buffer: Vec<f64> = (0..size * 8).map(|i| i as f64).collect();
            let mut data = group.scatter(&buffer)?;
            for elm in &mut data {
                *elm *= 4.0;
            }
            group.gather(&data)
        } else {
            let mut data: Vec<f64> = group.scatter_recv(0)?;
            for elm in &mut data {
                *elm *= 4.0;
            }
            group.gather_send(0, &data)?;
            Ok(vec![])
        }
    })
    .unwrap();

    let expected: Vec<f64> = (0..size * 8).map(|i| (i * 4) as f64).collect();
    assert_eq!(results[0].as_ref().unwrap(), &expected);
}

#[test]
fn gather_orders_segments_by_rank_not_arrival() {
    let results = channel::run_on_threads(4, |group| {
        let rank = group.rank();
        // Later ranks finish first.
        thread::sleep(Duration::from_millis(10 * (3 - rank as u64)));
        let segment = vec![rank * 10, rank * 10 + 1];
        if rank == 0 {
            group.gather(&segment)
        } else {
            group.gather_send(0, &segment)?;
            Ok(vec![])
        }
    })
    .unwrap();

    assert_eq!(
        results[0].as_ref().unwrap(),
        &vec![0u32, 1, 10, 11, 20, 21, 30, 31]
    );
}

#[test]
fn mismatched_tag_is_a_protocol_error() {
    let results = channel::run_on_threads(2, |group| {
        if group.rank() == 0 {
            group.send(&7u32, 1, 8)
        } else {
            group.recv::<u32>(0, 9).map(|_| ())
        }
    })
    .unwrap();

    assert!(results[0].is_ok());
    assert!(matches!(
        results[1],
        Err(Error::Transport(TransportError::TagMismatch {
            peer: 0,
            expected: 9,
            got: 8
        }))
    ));
}

#[test]
fn silent_peer_trips_the_liveness_window() {
    let results = channel::run_on_threads(2, |group| {
        if group.rank() == 0 {
            // Stay alive past the receiver's window without sending.
            thread::sleep(Duration::from_millis(400));
            Ok(0u32)
        } else {
            let group = group.with_liveness(Duration::from_millis(50));
            group.recv::<u32>(0, 1)
        }
    })
    .unwrap();

    assert!(matches!(
        results[1],
        Err(Error::Transport(TransportError::PeerUnresponsive { peer: 0, .. }))
    ));
}

#[test]
fn vanished_peer_is_a_disconnect() {
    let results = channel::run_on_threads(2, |group| {
        if group.rank() == 0 {
            // Return immediately; endpoints drop with the group.
            Ok(0u32)
        } else {
            group.recv::<u32>(0, 1)
        }
    })
    .unwrap();

    assert!(matches!(
        results[1],
        Err(Error::Transport(TransportError::Disconnected { peer: 0 }))
    ));
}

#[test]
fn teardown_is_idempotent_and_fences_later_calls() {
    let mut groups = ChannelGroup::form(2).unwrap();
    let mut rank1 = groups.pop().unwrap();
    let mut rank0 = groups.pop().unwrap();

    rank0.teardown();
    rank0.teardown();
    rank1.teardown();

    assert!(matches!(
        rank0.send(&1u32, 1, 1),
        Err(Error::Transport(TransportError::TornDown))
    ));
    assert!(matches!(
        rank1.recv::<u32>(0, 1),
        Err(Error::Transport(TransportError::TornDown))
    ));
}

#[test]
fn out_of_range_rank_is_rejected_not_a_panic() {
    let mut groups = ChannelGroup::form(2).unwrap();
    let rank0 = groups.remove(0);

    assert!(matches!(
        rank0.send(&1u32, 5, 1),
        Err(Error::Transport(TransportError::UnknownPeer { peer: 5, size: 2 }))
    ));
    assert!(matches!(
        rank0.recv::<u32>(9, 1),
        Err(Error::Transport(TransportError::UnknownPeer { peer: 9, size: 2 }))
    ));
}

#[test]
fn empty_group_fails_formation() {
    assert!(matches!(
        ChannelGroup::form(0),
        Err(Error::GroupFormation(_))
    ));
}

#[test]
fn explicit_labels_become_host_labels() {
    let labels = vec!["nodeA".to_string(), "nodeB".to_string()];
    let groups = ChannelGroup::form_labeled(labels).unwrap();
    assert_eq!(groups[0].host_label(), "nodeA");
    assert_eq!(groups[1].host_label(), "nodeB");
    assert_eq!(groups[1].rank(), 1);
    assert_eq!(groups[1].size(), 2);
}
