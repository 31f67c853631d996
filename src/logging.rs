use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer,
};

/// Targets the shell emits events under.
pub const TARGETS: [&str; 4] = ["parse", "exec", "jobs", "signals"];

fn compose_filter(debug: bool) -> Targets {
    let filter = Targets::new().with_default(LevelFilter::WARN);
    if !debug {
        return filter;
    }
    filter.with_targets(TARGETS.iter().map(|&target| (target, LevelFilter::DEBUG)))
}

/// Installs a stderr subscriber. Warnings only, unless `debug` is set.
pub fn init(debug: bool) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(debug)
        .with_filter(compose_filter(debug));

    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        eprintln!("warning: failed to initialize tracing.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_levels() {
        let quiet = compose_filter(false);
        assert!(!quiet.would_enable("jobs", &tracing::Level::DEBUG));
        assert!(!quiet.would_enable("exec", &tracing::Level::DEBUG));
        assert!(quiet.would_enable("jobs", &tracing::Level::WARN));

        let verbose = compose_filter(true);
        for target in TARGETS {
            assert!(verbose.would_enable(target, &tracing::Level::DEBUG));
        }
        assert!(!verbose.would_enable("rustyline", &tracing::Level::DEBUG));
    }
}
