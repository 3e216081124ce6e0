//! End-to-end playback scenarios.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::*;

fn wait_until(timeout: Duration, f: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    f()
}

fn recording_player(depth: usize, realtime: bool) -> (Recorder, Arc<PcmPlayer>) {
    let recorder = Recorder::new();
    let sink = ThreadSink::new(recorder.clone()).with_realtime(realtime);
    let player = PcmPlayer::new(sink, PlayerOptions::default().with_max_queue_depth(depth));
    (recorder, Arc::new(player))
}

/// Chunk `i` of a numbered stream: its index repeated, then a checksum byte.
fn numbered_chunk(i: u32, len: usize) -> Vec<u8> {
    let mut chunk: Vec<u8> = i.to_le_bytes().iter().copied().cycle().take(len - 1).collect();
    chunk.push((i % 251) as u8);
    chunk
}

#[test]
fn test_five_cd_chunks_play_in_order() {
    let (recorder, player) = recording_player(5, false);
    player.init(Format::new(2, 44100, 16)).unwrap();

    for fill in 0x01..=0x05u8 {
        player.feed_pcm_data(&[fill; 8192]).unwrap();
    }

    assert!(player.drain(Duration::from_secs(5)));
    player.stop();
    player.release();

    let chunks = recorder.chunks();
    assert_eq!(chunks.len(), 5);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk, &vec![i as u8 + 1; 8192]);
    }

    let stats = player.stats();
    assert_eq!(stats.chunks_fed, 5);
    assert_eq!(stats.chunks_played, 5);
    assert_eq!(stats.cold_starts, 1);
}

#[test]
fn test_round_trip_with_slow_device() {
    const N: u32 = 40;
    let sink = Arc::new(ManualSink::new());
    let player = Arc::new(PcmPlayer::new(
        Arc::clone(&sink),
        PlayerOptions::default().with_max_queue_depth(3),
    ));
    player.init(Format::STEREO_48K_16).unwrap();

    player.feed_pcm_data(&numbered_chunk(0, 64)).unwrap();
    let device = sink.handle().unwrap();

    let hw = Arc::clone(&device);
    let hardware = thread::spawn(move || {
        while hw.played().len() < N as usize {
            hw.fire();
            thread::sleep(Duration::from_millis(1));
        }
    });

    for i in 1..N {
        player.feed_pcm_data(&numbered_chunk(i, 64)).unwrap();
    }

    // The final fire parks in the pull callback until release.
    assert!(wait_until(Duration::from_secs(10), || {
        device.played().len() == N as usize
    }));
    player.release();
    hardware.join().unwrap();

    let played = device.played();
    assert_eq!(played.len(), N as usize);
    for (i, chunk) in played.iter().enumerate() {
        assert_eq!(chunk, &numbered_chunk(i as u32, 64));
    }
}

#[test]
fn test_queue_depth_stays_bounded() {
    const DEPTH: usize = 3;
    let (recorder, player) = recording_player(DEPTH, false);
    player.init(Format::MONO_16K_16).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let peak = Arc::new(AtomicUsize::new(0));
    let monitor = {
        let player = Arc::clone(&player);
        let done = Arc::clone(&done);
        let peak = Arc::clone(&peak);
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                peak.fetch_max(player.stats().queued, Ordering::SeqCst);
                thread::yield_now();
            }
        })
    };

    for i in 0..300u32 {
        player.feed_pcm_data(&numbered_chunk(i, 32)).unwrap();
        peak.fetch_max(player.stats().queued, Ordering::SeqCst);
    }
    assert!(player.drain(Duration::from_secs(10)));
    done.store(true, Ordering::SeqCst);
    monitor.join().unwrap();
    player.release();

    assert!(peak.load(Ordering::SeqCst) <= DEPTH);
    assert_eq!(recorder.len(), 300);
}

#[test]
fn test_full_queue_blocks_until_device_pulls() {
    let sink = Arc::new(ManualSink::new());
    let player = Arc::new(PcmPlayer::new(
        Arc::clone(&sink),
        PlayerOptions::default().with_max_queue_depth(1),
    ));
    player.init(Format::STEREO_44K_16).unwrap();

    // Chunk 1 goes to the device, chunk 2 fills the queue.
    player.feed_pcm_data(&[1; 16]).unwrap();
    player.feed_pcm_data(&[2; 16]).unwrap();
    let device = sink.handle().unwrap();

    let hw = Arc::clone(&device);
    let hardware = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        hw.fire()
    });

    let start = Instant::now();
    player.feed_pcm_data(&[3; 16]).unwrap();
    let waited = start.elapsed();

    assert!(hardware.join().unwrap());
    assert!(waited >= Duration::from_millis(80), "waited {:?}", waited);
    assert!(waited < Duration::from_secs(2), "waited {:?}", waited);
    assert_eq!(device.queued(), vec![vec![2; 16]]);
    assert_eq!(player.stats().queued, 1);
}

#[test]
fn test_realtime_device_paces_producer() {
    let (recorder, player) = recording_player(2, true);
    let format = Format::MONO_16K_16;
    player.init(format).unwrap();

    // 10 chunks of 10ms each.
    let chunk = vec![0u8; format.bytes_in_duration(Duration::from_millis(10)) as usize];
    let start = Instant::now();
    for _ in 0..10 {
        player.feed_pcm_data(&chunk).unwrap();
    }
    assert!(player.drain(Duration::from_secs(5)));
    let elapsed = start.elapsed();
    player.release();

    assert_eq!(recorder.len(), 10);
    assert!(elapsed >= Duration::from_millis(90), "elapsed {:?}", elapsed);
}

#[test]
fn test_pool_allocations_bounded_by_pipeline_depth() {
    const DEPTH: usize = 5;
    let (recorder, player) = recording_player(DEPTH, false);
    player.init(Format::STEREO_44K_16).unwrap();

    for i in 0..500u32 {
        player.feed_pcm_data(&numbered_chunk(i, 128)).unwrap();
    }
    assert!(player.drain(Duration::from_secs(10)));

    // Queue depth, plus one being filled and one being drained.
    let stats = player.stats();
    assert!(stats.buffers_allocated <= DEPTH + 2, "{:?}", stats);
    player.release();
    assert_eq!(recorder.len(), 500);
}

#[test]
fn test_stop_and_release_while_streaming() {
    let (_recorder, player) = recording_player(5, true);
    player.init(Format::MONO_16K_16).unwrap();

    let feeder = Feeder::new(Arc::clone(&player), 320);
    let stop = feeder.stop_handle();
    let worker = thread::spawn(move || feeder.run(io::repeat(0)));

    thread::sleep(Duration::from_millis(60));
    stop.stop();
    let summary = worker.join().unwrap().unwrap();
    assert_eq!(summary.outcome, FeedOutcome::Stopped);
    assert!(summary.chunks > 0);

    player.stop();
    player.release();
    player.release();
    assert!(!player.is_initialized());
}

#[test]
fn test_release_without_stop_fails_feeder() {
    let (_recorder, player) = recording_player(2, true);
    player.init(Format::MONO_16K_16).unwrap();

    let feeder = Feeder::new(Arc::clone(&player), 3200);
    let worker = thread::spawn(move || feeder.run(io::repeat(0)));

    thread::sleep(Duration::from_millis(50));
    player.release();

    match worker.join().unwrap() {
        Err(Error::Closed(_)) | Err(Error::NotInitialized) => {}
        other => panic!("unexpected feeder result: {:?}", other),
    }
}

#[test]
fn test_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PcmPlayer>();
    assert_send_sync::<ManualSink>();
    assert_send_sync::<ThreadSink<Recorder>>();
    assert_send_sync::<StopHandle>();
}

#[test]
fn test_thread_sink_over_any_writer_is_a_sink() {
    fn assert_sink<S: AudioSink>() {}
    assert_sink::<ThreadSink<Recorder>>();
    assert_sink::<ThreadSink<IoWriter<Vec<u8>>>>();
    assert_sink::<ThreadSink<IoWriter<Box<dyn io::Write + Send>>>>();
    assert_sink::<Arc<ManualSink>>();

    // A boxed writer streams played audio like the CLI output does.
    let out = Arc::new(parking_lot::Mutex::new(Vec::new()));
    struct Shared(Arc<parking_lot::Mutex<Vec<u8>>>);
    impl io::Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    let writer: Box<dyn io::Write + Send> = Box::new(Shared(Arc::clone(&out)));
    let sink = ThreadSink::new(IoWriter::new(writer)).with_realtime(false);
    let player = PcmPlayer::new(sink, PlayerOptions::default());
    player.init(Format::STEREO_44K_16).unwrap();
    player.feed_pcm_data(&[7; 32]).unwrap();
    player.feed_pcm_data(&[8; 32]).unwrap();
    assert!(player.drain(Duration::from_secs(5)));
    player.release();

    let mut expected = vec![7u8; 32];
    expected.extend_from_slice(&[8; 32]);
    assert_eq!(*out.lock(), expected);
}
