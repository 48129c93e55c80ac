use tracing::Level;
use tracing_subscriber::{
    fmt::writer::MakeWriterExt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub mod config;

pub fn setup_tracing() {
    // Logs go to stderr; stdout belongs to the screen renderer.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::Layer::new()
                .with_writer(std::io::stderr.with_max_level(Level::INFO))
                .compact(),
        )
        .init();
}
