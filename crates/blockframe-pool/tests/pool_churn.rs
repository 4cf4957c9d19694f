//! Pool behaviour under document churn
//!
//! Random mount/unmount sequences across a few blocks must never:
//! - let two mounts own one frame
//! - let two `src` values share a frame
//! - destroy a frame because of a release
//! - fetch content again for a block whose parked frame could be reused

use blockframe_pool::{
    FramePool, MemoryHost, Millis, MountHandle, MountId, MountSignal, PlaceholderId, PoolConfig,
    Src,
};
use blockframe_protocol::Envelope;
use proptest::prelude::*;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedReceiver;

const BLOCKS: [&str; 3] = ["report-a", "report-b", "sales-chart"];

#[derive(Debug, Clone)]
enum Step {
    Mount(usize),
    Unmount(usize),
    Ready(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..BLOCKS.len()).prop_map(Step::Mount),
        (0..BLOCKS.len()).prop_map(Step::Unmount),
        (0..BLOCKS.len()).prop_map(Step::Ready),
    ]
}

struct Live {
    mount: MountId,
    _signals: UnboundedReceiver<MountSignal>,
}

proptest! {
    #[test]
    fn prop_churn_preserves_ownership(steps in prop::collection::vec(step(), 1..60)) {
        let mut pool = FramePool::new(MemoryHost::new(), PoolConfig::default());
        let srcs: Vec<Src> = BLOCKS.iter().map(|b| Src::new(*b).unwrap()).collect();
        let mut live: HashMap<usize, Vec<Live>> = HashMap::new();
        let mut placeholder = 0_u64;

        for (tick, step) in steps.into_iter().enumerate() {
            let now = Millis::new(tick as u64 * 16);
            match step {
                Step::Mount(i) => {
                    placeholder += 1;
                    let had_parked = pool.records_for(&srcs[i]).iter().any(|r| r.is_parked());
                    let fetches_before = pool.host().fetch_count(&srcs[i]);

                    let (handle, signals) = MountHandle::new(MountId::new(), PlaceholderId(placeholder));
                    let mount = handle.mount;
                    let acquisition = pool.acquire(&srcs[i], handle, now);

                    prop_assert_eq!(acquisition.reused, had_parked);
                    if had_parked {
                        prop_assert_eq!(pool.host().fetch_count(&srcs[i]), fetches_before);
                    }
                    live.entry(i).or_default().push(Live { mount, _signals: signals });
                }
                Step::Unmount(i) => {
                    if let Some(entry) = live.get_mut(&i).and_then(Vec::pop) {
                        pool.release(&srcs[i], entry.mount).unwrap();
                    }
                }
                Step::Ready(i) => {
                    for record in pool.records_for(&srcs[i]).iter().map(|r| r.channel).collect::<Vec<_>>() {
                        let envelope = Envelope::new(record, r#"{"type":"ready","height":42}"#);
                        pool.handle_envelope(&envelope).unwrap();
                    }
                }
            }

            // Every live mount owns exactly one frame of its own src.
            for (i, mounts) in &live {
                for entry in mounts {
                    let owned = pool.owned_by(&srcs[*i], entry.mount);
                    prop_assert!(owned.is_some());
                    prop_assert_eq!(&owned.unwrap().src, &srcs[*i]);
                    for (j, other) in srcs.iter().enumerate() {
                        if j != *i {
                            prop_assert!(pool.owned_by(other, entry.mount).is_none());
                        }
                    }
                }
            }

            // At most one parked frame per src, and all frames stay alive.
            for src in &srcs {
                let parked = pool.records_for(src).iter().filter(|r| r.is_parked()).count();
                prop_assert!(parked <= 1);
            }
            prop_assert_eq!(pool.host().live_count(), pool.len());
        }
    }
}

#[test]
fn releasing_one_block_never_hides_another() {
    let mut pool = FramePool::new(MemoryHost::new(), PoolConfig::default());
    let a = Src::new("report-a").unwrap();
    let b = Src::new("report-b").unwrap();

    let (ha, _ra) = MountHandle::new(MountId::new(), PlaceholderId(1));
    let ma = ha.mount;
    pool.acquire(&a, ha, Millis::ZERO);
    let (hb, _rb) = MountHandle::new(MountId::new(), PlaceholderId(2));
    let cb = pool.acquire(&b, hb, Millis::ZERO).channel.unwrap();

    pool.release(&a, ma).unwrap();

    let node_b = pool.record(cb).unwrap().node;
    let shown = pool.host().node(node_b).unwrap();
    assert!(shown.visible);
    assert_eq!(shown.placeholder, Some(PlaceholderId(2)));
    assert_eq!(pool.host().node_at(PlaceholderId(2)), Some(node_b));
}
