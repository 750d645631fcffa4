//! Tracing subscriber setup.

/// Initialize the tracing subscriber with environment filter.
///
/// Uses static directive strings that are compile-time constants guaranteed to parse.
#[allow(clippy::expect_used)]
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "safety_core=info"
                    .parse()
                    .expect("static directive 'safety_core=info' is valid"),
            ),
        )
        .init();
}
