use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(#[from] crate::provider::Error),

    #[error("TTS error: {0}")]
    Tts(#[from] crate::tts::TtsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_anyhow_at_the_binary_boundary() {
        let err = anyhow::Error::from(Error::Config("bad config.toml".to_string()));
        assert!(err.to_string().contains("bad config.toml"));
    }
}
