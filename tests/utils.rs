use crossbeam_channel::Receiver;
use metronome::prelude::*;
use metronome::StatsClient;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[allow(dead_code)]
pub const NUM_THREADS: u64 = 100;

#[allow(dead_code)]
pub const NUM_ITERATIONS: u64 = 1_000;

#[allow(dead_code)]
pub fn run_arc_threaded_test(client: StatsClient, num_threads: u64, iterations: u64) {
    let shared_client = Arc::new(client);

    let threads: Vec<_> = (0..num_threads)
        .map(|_| {
            let local_client = Arc::clone(&shared_client);

            thread::spawn(move || {
                for i in 0..iterations {
                    local_client.incr_by("some.counter", i as i64);
                    local_client.decr("some.counter");
                    local_client.timing("some.timer", i);
                    local_client.timing("some.timer", Duration::from_micros(i));
                    local_client.gauge("some.gauge", i);
                    local_client.gauge("some.gauge", i as f64);
                    local_client.gauge_delta("some.gauge", -(i as i64));
                    local_client.set("some.set", i as i64);
                    local_client.with_pipeline(|pipe| {
                        pipe.incr("some.pipelined.counter");
                        pipe.gauge("some.pipelined.gauge", -1);
                    });
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }
}

/// Collect everything received so far as strings.
#[allow(dead_code)]
pub fn drain(rx: &Receiver<Vec<u8>>) -> Vec<String> {
    rx.try_iter().map(|d| String::from_utf8(d).unwrap()).collect()
}
