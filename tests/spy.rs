use metronome::parse::parse_datagram;
use metronome::prelude::*;
use metronome::{SpyMetricSink, StatsClient};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Mutex;

mod utils;
use utils::{drain, run_arc_threaded_test, NUM_ITERATIONS, NUM_THREADS};

fn new_spy_client(prefix: &str) -> StatsClient {
    let (_rx, sink) = SpyMetricSink::new();
    StatsClient::from_sink(prefix, sink)
}

#[test]
fn test_statsd_client_spy_sink_single_threaded() {
    let client = new_spy_client("metronome");
    run_arc_threaded_test(client, 1, 1);
}

#[ignore]
#[test]
fn test_statsd_client_spy_sink_many_threaded() {
    let client = new_spy_client("metronome");
    run_arc_threaded_test(client, NUM_THREADS, NUM_ITERATIONS);
}

#[test]
fn test_pipeline_preserves_write_order_across_datagrams() {
    let (rx, sink) = SpyMetricSink::new();
    let client = StatsClient::builder("app", sink).with_max_udp_size(64).build();

    let names: Vec<String> = (0..50).map(|i| format!("metric.{}", i)).collect();
    client.with_pipeline(|pipe| {
        for name in names.iter() {
            pipe.incr(name);
        }
    });

    let datagrams = drain(&rx);
    assert!(datagrams.len() > 1);

    let mut seen = Vec::new();
    for datagram in datagrams.iter() {
        assert!(datagram.len() < 64, "datagram too large: {:?}", datagram);
        assert!(!datagram.ends_with('\n'));
        for line in parse_datagram(datagram).unwrap() {
            seen.push(line.name.trim_start_matches("app.").to_string());
        }
    }

    assert_eq!(names, seen);
}

#[test]
fn test_seeded_sampling_is_reproducible() {
    let run = || {
        let (rx, sink) = SpyMetricSink::new();
        let client = StatsClient::builder("", sink)
            .with_sampler(Mutex::new(ChaCha8Rng::seed_from_u64(99)))
            .build();

        for i in 0..200 {
            client
                .incr_by_with_tags("sampled", i)
                .with_sample_rate(0.25)
                .send();
        }
        drain(&rx)
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert!(!first.is_empty());
    assert!(first.iter().all(|l| l.contains("|@0.25")));
}

#[test]
fn test_negative_gauge_is_sampled_once() {
    let (rx, sink) = SpyMetricSink::new();
    let client = StatsClient::builder("", sink)
        .with_sampler(Mutex::new(ChaCha8Rng::seed_from_u64(3)))
        .build();

    for _ in 0..200 {
        client.gauge_with_tags("g", -5).with_sample_rate(0.5).send();
    }

    for datagram in drain(&rx) {
        assert_eq!("g:0|g\ng:-5|g", datagram);
    }
}

#[test]
fn test_global_tags_mutation_between_pipelines() {
    let (rx, sink) = SpyMetricSink::new();
    let mut client = StatsClient::from_sink("", sink);

    client.with_pipeline(|pipe| pipe.incr("a"));
    client.set_global_tag("region", "eu");
    client.with_pipeline(|pipe| pipe.incr("b"));

    assert_eq!(vec!["a:1|c", "b:1|c|region:eu"], drain(&rx));
}
