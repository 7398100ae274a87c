//! Concurrent start/cancel against the idle timer's generation guard.

use bunnybot::IdleTimer;
use bunnybot::pipeline::messages::IdleFired;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_start_cancel_never_double_fires() {
    let (tx, mut rx) = mpsc::unbounded_channel::<IdleFired>();
    let timer = IdleTimer::new(Duration::from_millis(2), tx);

    let mut tasks = Vec::new();
    for worker in 0..8u64 {
        let timer = timer.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..200u64 {
                if (i + worker) % 3 == 0 {
                    timer.cancel();
                } else {
                    timer.start();
                }
                if i % 7 == 0 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                } else {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    timer.cancel();
    let final_generation = timer.generation();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut fires = Vec::new();
    while let Ok(fired) = rx.try_recv() {
        fires.push(fired.generation);
    }

    let unique: HashSet<u64> = fires.iter().copied().collect();
    assert_eq!(unique.len(), fires.len(), "a generation fired twice: {fires:?}");
    assert!(
        fires.iter().all(|g| *g < final_generation),
        "fire observed for a generation started after the final cancel"
    );
    assert!(!timer.is_armed());
    assert!(fires.iter().all(|g| !timer.is_current(*g)));
}

#[tokio::test(start_paused = true)]
async fn start_cancel_start_fires_once_for_second_deadline() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let timer = IdleTimer::new(Duration::from_secs(12), tx);

    timer.start();
    tokio::time::sleep(Duration::from_secs(6)).await;
    timer.cancel();
    timer.cancel();
    let begin = tokio::time::Instant::now();
    timer.start();
    let second = timer.generation();

    let fired = rx.recv().await.unwrap();
    assert_eq!(fired.generation, second);
    assert!(begin.elapsed() >= Duration::from_secs(12));

    let extra = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
    assert!(extra.is_err(), "timer fired twice");
}

#[tokio::test(start_paused = true)]
async fn rapid_activity_keeps_postponing_the_fire() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let timer = IdleTimer::new(Duration::from_secs(12), tx);

    // Activity every 5 seconds, each followed by a fresh countdown.
    for _ in 0..10 {
        timer.cancel();
        timer.start();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    let fired = rx.recv().await.unwrap();
    assert!(timer.is_current(fired.generation));
}
