//! Model-based property tests for the virtual-clock scheduler.

use std::collections::HashMap;
use std::time::Duration;

use proptest::prelude::*;

use typing_core::{Scheduler, TimerKind};

const KINDS: [TimerKind; 6] = [
    TimerKind::KeyClear,
    TimerKind::WrongKeyClear,
    TimerKind::SpeakCompleted,
    TimerKind::Advance,
    TimerKind::GameOver,
    TimerKind::PracticeFlash,
];

#[derive(Debug, Clone)]
enum Op {
    Schedule(usize, u64, u64),
    Cancel(usize),
    Advance(u64),
    Drain,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..KINDS.len(), 0u64..1000, 0u64..4).prop_map(|(k, d, g)| Op::Schedule(k, d, g)),
        1 => (0..KINDS.len()).prop_map(Op::Cancel),
        3 => (0u64..700).prop_map(Op::Advance),
        2 => Just(Op::Drain),
    ]
}

proptest! {
    #[test]
    fn scheduler_matches_model(ops in prop::collection::vec(arb_op(), 1..80)) {
        let mut scheduler = Scheduler::new();
        // kind -> (deadline, generation)
        let mut model: HashMap<TimerKind, (Duration, u64)> = HashMap::new();

        for op in ops {
            match op {
                Op::Schedule(k, delay, generation) => {
                    let kind = KINDS[k];
                    let delay = Duration::from_millis(delay);
                    scheduler.schedule(kind, delay, generation);
                    model.insert(kind, (scheduler.now() + delay, generation));
                }
                Op::Cancel(k) => {
                    scheduler.cancel(KINDS[k]);
                    model.remove(&KINDS[k]);
                }
                Op::Advance(ms) => {
                    let before = scheduler.now();
                    scheduler.advance(Duration::from_millis(ms));
                    prop_assert_eq!(scheduler.now(), before + Duration::from_millis(ms));
                }
                Op::Drain => {
                    let now = scheduler.now();
                    let mut last = Duration::ZERO;
                    while let Some(fired) = scheduler.pop_due() {
                        let (deadline, generation) = model
                            .remove(&fired.kind)
                            .expect("fired timer was pending");
                        prop_assert!(deadline <= now);
                        prop_assert!(deadline >= last);
                        prop_assert_eq!(fired.generation, generation);
                        last = deadline;
                    }
                    prop_assert!(model.values().all(|(deadline, _)| *deadline > now));
                }
            }

            for kind in KINDS {
                prop_assert_eq!(scheduler.is_pending(kind), model.contains_key(&kind));
            }
            prop_assert_eq!(
                scheduler.next_deadline(),
                model.values().map(|(deadline, _)| *deadline).min()
            );
        }
    }
}
