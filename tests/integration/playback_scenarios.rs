//! Playback ordering and its interaction with the idle timer.

use crate::helpers::Speaker;
use bunnybot::pipeline::messages::PlaybackItem;
use bunnybot::{IdleTimer, PlaybackQueue};
use std::time::Duration;
use tokio::sync::mpsc;

fn item(segments: &[&str]) -> PlaybackItem {
    segments.iter().copied().collect()
}

fn timer() -> IdleTimer {
    let (tx, _rx) = mpsc::unbounded_channel();
    IdleTimer::new(Duration::from_secs(12), tx)
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn segments_spoken_fifo_across_items() {
    let speaker = Speaker::open();
    let queue = PlaybackQueue::spawn(speaker.clone(), timer());

    queue.enqueue(item(&["seg1", "seg2"])).unwrap();
    queue.enqueue(item(&["seg3"])).unwrap();
    queue.stop().await;

    assert_eq!(speaker.spoken(), vec!["seg1", "seg2", "seg3"]);
}

#[tokio::test]
async fn timer_stays_disarmed_until_last_item_drains() {
    let speaker = Speaker::gated();
    let idle = timer();
    assert!(idle.start());
    let queue = PlaybackQueue::spawn(speaker.clone(), idle.clone());

    queue.enqueue(item(&["Hello"])).unwrap();
    queue.enqueue(item(&["How are you"])).unwrap();
    assert!(!idle.is_armed());

    wait_until(|| speaker.spoken().len() == 1).await;
    assert!(!idle.is_armed());

    speaker.release(1);
    wait_until(|| queue.pending() == 1 && speaker.spoken().len() == 2).await;
    assert!(!idle.is_armed(), "second item still playing");

    speaker.release(1);
    wait_until(|| queue.is_idle()).await;
    assert!(idle.is_armed());
    assert_eq!(speaker.spoken(), vec!["Hello", "How are you"]);

    queue.stop().await;
}

#[tokio::test]
async fn enqueue_while_draining_cancels_rearmed_timer() {
    let speaker = Speaker::gated();
    let idle = timer();
    let queue = PlaybackQueue::spawn(speaker.clone(), idle.clone());

    queue.enqueue(item(&["first"])).unwrap();
    speaker.release(1);
    wait_until(|| queue.is_idle()).await;
    assert!(idle.is_armed());

    queue.enqueue(item(&["second"])).unwrap();
    assert!(!idle.is_armed());

    speaker.release(1);
    queue.stop().await;
    assert_eq!(speaker.spoken(), vec!["first", "second"]);
}

#[tokio::test]
async fn items_queued_before_stop_are_still_spoken() {
    let speaker = Speaker::gated();
    let queue = PlaybackQueue::spawn(speaker.clone(), timer());

    queue.enqueue(item(&["a", "b"])).unwrap();
    queue.enqueue(item(&["c"])).unwrap();
    speaker.release(3);
    queue.stop().await;

    assert_eq!(speaker.spoken(), vec!["a", "b", "c"]);
    assert!(queue.enqueue(item(&["late"])).is_err());
}
