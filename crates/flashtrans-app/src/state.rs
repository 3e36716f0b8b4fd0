use flashtrans_config::Config;
use flashtrans_core::Backends;

pub struct AppState {
    pub config: Config,
    pub backends: Backends,
}

impl AppState {
    /// Load the configured backends; engines that fail to load are disabled
    pub fn new(config: Config) -> Self {
        let backends = Backends::from_config(&config);

        if !backends.recognizer.is_ready() {
            tracing::warn!("OCR engine {} is not ready", backends.recognizer.name());
        }
        if !backends.translator.is_ready() {
            tracing::warn!(
                "Translator {} is not ready, requests will fail with ModelNotLoaded",
                backends.translator.metadata().name
            );
        }

        Self { config, backends }
    }

    pub fn with_backends(config: Config, backends: Backends) -> Self {
        Self { config, backends }
    }
}
