//! End-to-end behaviour of a typing session driven through a recording
//! harness and the virtual clock.

use std::rc::Rc;

use pinyin_typing::{PinyinTranscoder, TypingPhase, TypingSession};
use typing_core::testing::{Harness, RecordingNarrator};
use typing_core::{
    Config, ContentCategory, GameState, ProgressStore, RewardSink, SessionEvent, WordItem,
};

fn session(items: Vec<WordItem>) -> TypingSession {
    TypingSession::new(
        ContentCategory::Easy,
        items.into(),
        Rc::new(PinyinTranscoder::new()),
    )
}

fn two_words() -> Vec<WordItem> {
    vec![
        WordItem::new("你好", "nihao", "nǐ hǎo"),
        WordItem::new("世界", "shijie", "shì jiè"),
    ]
}

fn count<F: Fn(&SessionEvent) -> bool>(events: &[SessionEvent], f: F) -> usize {
    events.iter().filter(|e| f(e)).count()
}

#[test]
fn nihao_typed_spoken_and_advanced() {
    let mut h = Harness::new(Config::default());
    let mut s = session(two_words());
    s.start(&mut h.cx(), 0, true);
    assert_eq!(h.spoken(), vec!["你好"]);

    for buffer in ["n", "ni", "nih", "niha", "nihao"] {
        s.handle_input(&mut h.cx(), buffer);
    }
    assert_eq!(s.current_input(), "nihao");
    assert_eq!(s.phase(), TypingPhase::WordComplete);
    assert_eq!(s.hint(), None);

    // Each character once, then the whole word
    assert_eq!(h.spoken(), vec!["你好", "你", "好", "你好"]);
    // Keys 0ms apart: fast typing, doubled again for single characters
    assert_eq!(h.narrator.spoken[1].rate, 3.0);
    assert_eq!(h.narrator.spoken[3].rate, 1.0);

    let completed: Vec<_> = h
        .events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::CharacterCompleted { char_index, text } => {
                Some((*char_index, text.as_str()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![(0, "你"), (1, "好")]);
    assert_eq!(h.rewards.score(), 12);
    assert!((h.rewards.coins() - 0.25).abs() < 1e-9);

    // Narration finished at once; the advance waits for the standard delay
    h.tick(&mut s, 0.1);
    assert_eq!(s.index(), 0);
    h.tick(&mut s, 0.15);
    assert_eq!(s.index(), 1);
    assert_eq!(s.phase(), TypingPhase::Inputting);
    assert_eq!(s.current_input(), "");
    assert_eq!(s.target_input(), "shijie");
    assert_eq!(h.progress.load_progress(ContentCategory::Easy), 0);
    assert_eq!(h.spoken().last(), Some(&"世界"));
}

#[test]
fn typo_in_last_syllable_keeps_good_prefix() {
    let mut h = Harness::new(Config::default());
    let mut s = session(two_words());
    s.start(&mut h.cx(), 0, false);

    s.handle_input(&mut h.cx(), "n");
    assert_eq!(s.last_completed_char(), None);
    s.handle_input(&mut h.cx(), "ni");
    assert_eq!(s.last_completed_char(), Some(0));
    assert_eq!(s.hint(), Some('h'));
    s.handle_input(&mut h.cx(), "nih");
    s.handle_input(&mut h.cx(), "nihax");

    assert_eq!(s.current_input(), "niha");
    assert!(s.is_wrong());
    assert_eq!(s.play().health(), 4);
    assert_eq!(h.rewards.combo(), 0);
    assert_eq!(s.phase(), TypingPhase::Inputting);
    assert!(h
        .events
        .contains(&SessionEvent::WrongKey { key: 'x', position: 4 }));
}

#[test]
fn burst_stops_at_first_mistake() {
    let mut h = Harness::new(Config::default());
    let mut s = session(two_words());
    s.start(&mut h.cx(), 0, false);

    s.handle_input(&mut h.cx(), "niwrongX");
    // Uppercase is cleaned first and handed back to the host
    assert_eq!(s.current_input(), "");
    assert_eq!(
        h.events.last(),
        Some(&SessionEvent::BufferRewritten("niwrongx".into()))
    );

    h.take_events();
    s.handle_input(&mut h.cx(), "niwrongx");
    assert_eq!(s.current_input(), "ni");
    assert!(s.is_wrong());
    assert_eq!(s.play().health(), 4);
    assert_eq!(
        count(&h.events, |e| matches!(e, SessionEvent::WrongKey { .. })),
        1
    );
    assert_eq!(
        h.events.last(),
        Some(&SessionEvent::BufferRewritten("ni".into()))
    );

    // The wrong flag clears on its own
    h.tick(&mut s, 0.5);
    assert!(!s.is_wrong());
    assert_eq!(s.hint(), Some('h'));
}

#[test]
fn deletion_is_never_judged() {
    let mut h = Harness::new(Config::default());
    let mut s = session(two_words());
    s.start(&mut h.cx(), 0, false);
    s.handle_input(&mut h.cx(), "niha");
    let combo = h.rewards.combo();
    let score = h.rewards.score();
    assert_eq!(combo, 4);
    for buffer in ["nih", "n", ""] {
        s.handle_input(&mut h.cx(), buffer);
        assert_eq!(s.current_input(), buffer);
        assert_eq!(s.play().health(), 5);
        assert_eq!(h.rewards.combo(), combo);
        assert_eq!(h.rewards.score(), score);
    }
    assert_eq!(s.play().health(), 5);
    assert_eq!(s.hint(), Some('n'));
    assert_eq!(
        count(&h.events, |e| matches!(e, SessionEvent::WrongKey { .. })),
        0
    );
    // A deleted character is not announced again when retyped
    let before = h.spoken().len();
    s.handle_input(&mut h.cx(), "ni");
    assert_eq!(h.spoken().len(), before);
    assert_eq!(s.last_completed_char(), Some(0));
}

#[test]
fn shrinking_edit_off_the_target_is_not_judged() {
    let mut h = Harness::new(Config::default());
    let mut s = session(two_words());
    s.start(&mut h.cx(), 0, false);
    s.handle_input(&mut h.cx(), "niha");
    let combo = h.rewards.combo();
    let score = h.rewards.score();
    h.take_events();

    // Shorter but not a prefix: keep the common part, judge nothing
    s.handle_input(&mut h.cx(), "nx");
    assert_eq!(s.current_input(), "n");
    assert_eq!(s.play().health(), 5);
    assert_eq!(h.rewards.combo(), combo);
    assert_eq!(h.rewards.score(), score);
    assert!(!s.is_wrong());
    assert_eq!(
        count(&h.events, |e| matches!(e, SessionEvent::WrongKey { .. })),
        0
    );
}

#[test]
fn single_character_item_spoken_once_on_completion() {
    let mut h = Harness::new(Config::default());
    let mut s = session(vec![WordItem::new("好", "hao", "hǎo")]);
    s.start(&mut h.cx(), 0, true);
    assert_eq!(h.spoken(), vec!["好"]);

    s.handle_input(&mut h.cx(), "hao");
    // No per-character narration, one utterance for the finished item
    assert_eq!(h.spoken(), vec!["好", "好"]);
    assert_eq!(h.narrator.spoken[1].rate, 2.0);
    assert_eq!(
        count(&h.events, |e| matches!(
            e,
            SessionEvent::CharacterCompleted { char_index: 0, .. }
        )),
        1
    );
}

#[test]
fn manual_navigation_drops_pending_advance() {
    let mut config = Config::default();
    config.delay_before_speak = 0.5;
    let mut h = Harness::new(config);
    let mut s = session(two_words());
    s.start(&mut h.cx(), 0, false);
    s.handle_input(&mut h.cx(), "nihao");
    assert_eq!(s.phase(), TypingPhase::WordComplete);
    let spoken = h.spoken().len();

    s.next(&mut h.cx());
    assert_eq!(s.index(), 1);
    h.tick(&mut s, 5.0);
    // The completed item is never narrated and nothing moves us on
    assert_eq!(s.index(), 1);
    assert_eq!(h.spoken().len(), spoken + 1);
    assert_eq!(h.spoken().last(), Some(&"世界"));
}

#[test]
fn delayed_completion_narration() {
    let mut config = Config::default();
    config.delay_before_speak = 0.3;
    let mut h = Harness::new(config);
    let mut s = session(two_words());
    s.start(&mut h.cx(), 0, false);
    s.handle_input(&mut h.cx(), "nihao");
    assert_eq!(h.spoken(), vec!["你好", "你", "好"]);

    h.tick(&mut s, 0.3);
    assert_eq!(h.spoken(), vec!["你好", "你", "好", "你好"]);
    assert_eq!(s.index(), 0);
    h.tick(&mut s, 0.2);
    assert_eq!(s.index(), 1);
}

#[test]
fn advance_waits_for_narration() {
    let mut h = Harness::new(Config::default()).with_narrator(RecordingNarrator::manual());
    let mut s = session(two_words());
    s.start(&mut h.cx(), 0, false);
    s.handle_input(&mut h.cx(), "nihao");
    assert_eq!(h.narrator.in_flight(), 3);

    h.tick(&mut s, 2.0);
    assert_eq!(s.index(), 0);

    // Character narration finishing does not count
    h.narrator.finish_next();
    h.narrator.finish_next();
    h.tick(&mut s, 2.0);
    assert_eq!(s.index(), 0);

    h.narrator.finish_next();
    h.tick(&mut s, 0.1);
    assert_eq!(s.index(), 0);
    h.tick(&mut s, 0.15);
    assert_eq!(s.index(), 1);
}

#[test]
fn health_disabled_never_ends_game() {
    let mut config = Config::default();
    config.max_health = 0;
    let mut h = Harness::new(config);
    let mut s = session(two_words());
    s.start(&mut h.cx(), 0, false);
    for _ in 0..10 {
        s.handle_input(&mut h.cx(), "x");
    }
    h.tick(&mut s, 5.0);
    assert_eq!(s.state(), GameState::Playing);
    assert_eq!(s.play().health(), 0);
    assert_eq!(
        count(&h.events, |e| matches!(e, SessionEvent::HealthChanged { .. })),
        1
    );
}

#[test]
fn depleted_health_ends_game_after_delay() {
    let mut config = Config::default();
    config.max_health = 2;
    let mut h = Harness::new(config);
    let mut s = session(two_words());
    s.start(&mut h.cx(), 1, false);
    s.handle_input(&mut h.cx(), "x");
    assert!(h
        .events
        .contains(&SessionEvent::LowHealth { health: 1 }));
    s.handle_input(&mut h.cx(), "x");
    assert_eq!(s.play().health(), 0);
    assert_eq!(s.state(), GameState::Playing);

    h.tick(&mut s, 0.4);
    assert_eq!(s.state(), GameState::Playing);
    h.tick(&mut s, 0.2);
    assert_eq!(s.state(), GameState::GameOver);
    assert_eq!(h.progress.load_progress(ContentCategory::Easy), 1);

    // Input is dead until restarted
    s.handle_input(&mut h.cx(), "s");
    assert_eq!(s.current_input(), "");
    s.start(&mut h.cx(), 1, false);
    assert_eq!(s.play().health(), 2);
    s.handle_input(&mut h.cx(), "s");
    assert_eq!(s.current_input(), "s");
}

#[test]
fn poem_lines_track_active_line() {
    let mut h = Harness::new(Config::default());
    let mut s = session(vec![WordItem::new(
        "床前明月光，\n疑是地上霜。",
        "",
        "chuáng qián míng yuè guāng\nyí shì dì shàng shuāng",
    )]);
    s.start(&mut h.cx(), 0, false);
    assert_eq!(s.lines().len(), 2);
    assert_eq!(s.active_line(), Some(0));

    s.handle_input(&mut h.cx(), "chuangqianmingyueguang");
    assert_eq!(s.active_line(), Some(1));
    assert_eq!(s.hint(), Some('y'));
    assert_eq!(s.last_completed_char(), Some(4));

    s.handle_input(&mut h.cx(), "chuangqianmingyueguangyi");
    // Index counts the comma and the newline
    assert_eq!(s.last_completed_char(), Some(7));
    assert_eq!(h.spoken().last(), Some(&"疑"));
}

#[test]
fn stop_saves_progress_and_goes_idle() {
    let mut h = Harness::new(Config::default());
    let mut s = session(two_words());
    s.start(&mut h.cx(), 1, false);
    s.handle_input(&mut h.cx(), "sh");
    s.stop(&mut h.cx());
    assert_eq!(s.state(), GameState::Idle);
    assert_eq!(s.phase(), TypingPhase::Idle);
    assert_eq!(h.progress.load_progress(ContentCategory::Easy), 1);
    s.handle_input(&mut h.cx(), "shi");
    assert_eq!(s.current_input(), "sh");
    assert!(h.rewards.combo() > 0);
}

#[test]
fn empty_content_is_inert() {
    let mut h = Harness::new(Config::default());
    let mut s = session(Vec::new());
    s.start(&mut h.cx(), 3, true);
    s.handle_input(&mut h.cx(), "abc");
    s.next(&mut h.cx());
    s.previous(&mut h.cx());
    assert!(s.current_item().is_none());
    assert_eq!(s.current_input(), "");
    assert!(h.spoken().is_empty());
}
